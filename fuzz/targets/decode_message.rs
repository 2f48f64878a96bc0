#![no_main]

use bflat::Deserializer;
use libfuzzer_sys::fuzz_target;

// Декодер не должен паниковать ни на каких данных, а ошибка не должна
// сдвигать курсор.
fuzz_target!(|data: &[u8]| {
    let mut reader = Deserializer::new(data);
    loop {
        let before = reader.position();
        match reader.next_record() {
            Ok(Some(record)) => {
                assert!(reader.position() > before);
                if let Some(array) = record.array() {
                    // У массива null тело пустое, а счётчик любой.
                    let drained = array
                        .elements()
                        .take(4096)
                        .take_while(Result::is_ok)
                        .count();
                    assert!(drained as u64 <= array.count());
                    for index in 0..array.count().min(64) as usize {
                        let _ = array.get(index);
                    }
                }
                let _ = record.to_string();
            }
            Ok(None) => {
                assert_eq!(before, data.len());
                break;
            }
            Err(e) => {
                assert_eq!(reader.position(), before);
                assert!(e.offset() <= data.len());
                break;
            }
        }
    }
});
