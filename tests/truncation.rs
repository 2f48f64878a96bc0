//! Обрезанные сообщения: любой неполный префикс даёт ошибку, а не чистый
//! конец и не панику.

use bflat::{DecodeError, Deserializer, Serializer};

fn sample_message() -> Vec<u8> {
    let mut s: Serializer = Serializer::new();
    s.append_null("none").unwrap();
    s.append_string("a long string tag", "payload").unwrap();
    s.append_binary("bin", &[0xAA; 130]).unwrap();
    s.append_int16_array("i16", &[1, 2, 3]).unwrap();
    s.append_leb128_array("leb", &[-1, 1 << 50, 0]).unwrap();
    s.append_string_array("names", &["x", "yy"]).unwrap();
    s.append_double("d", 1.25).unwrap();
    s.data().to_vec()
}

/// Смещения начала каждой записи.
fn record_starts(data: &[u8]) -> Vec<usize> {
    Deserializer::new(data)
        .map(|r| r.unwrap().offset())
        .collect()
}

#[test]
fn test_every_cut_inside_a_record_is_an_error() {
    let data = sample_message();
    let mut boundaries = record_starts(&data);
    boundaries.push(data.len());

    for cut in 0..=data.len() {
        let prefix = &data[..cut];
        let results: Vec<_> = Deserializer::new(prefix).collect();
        let complete = boundaries.iter().filter(|&&b| b != 0 && b <= cut).count();

        if boundaries.contains(&cut) {
            assert!(
                results.iter().all(Result::is_ok),
                "cut at record boundary {cut} must be clean"
            );
            assert_eq!(results.len(), complete);
        } else {
            let (last, ok) = results.split_last().unwrap();
            assert!(ok.iter().all(Result::is_ok));
            assert_eq!(ok.len(), complete, "records before cut {cut}");
            let err = last.as_ref().unwrap_err();
            assert!(err.offset() <= cut, "offset {} beyond cut {cut}", err.offset());
        }
    }
}

#[test]
fn test_error_does_not_move_cursor() {
    let data = sample_message();
    let cut = data.len() - 3;
    let mut reader = Deserializer::new(&data[..cut]);

    while let Ok(Some(_)) = reader.next_record() {}
    let position = reader.position();
    let first = reader.next_record().unwrap_err();
    assert_eq!(reader.position(), position);
    assert_eq!(reader.next_record().unwrap_err(), first);
}

#[test]
fn test_iterator_stops_after_error() {
    let data = [0x2B, b'f', b'o', b'o', 0x01];
    let mut reader = Deserializer::new(&data);
    assert!(matches!(reader.next(), Some(Err(DecodeError::Format { .. }))));
    assert!(reader.next().is_none());
    assert!(reader.next().is_none());
}

#[test]
fn test_error_kinds() {
    // Тег обрезан
    let err = Deserializer::new(&[0x2B, b'f']).next_record().unwrap_err();
    assert!(matches!(err, DecodeError::Tag { .. }));

    // Неизвестный тип 0xA
    let err = Deserializer::new(&[0x51, b'x']).next_record().unwrap_err();
    assert!(matches!(err, DecodeError::Format { .. }));

    // Длина строки больше остатка
    let err = Deserializer::new(&[0x09, b'x', 0x05, b'a']).next_record().unwrap_err();
    assert!(matches!(err, DecodeError::Format { .. }));

    // Счётчик массива обещает больше элементов, чем есть байт
    let err = Deserializer::new(&[0x99, b'x', 0x10, 0x01, 0x00])
        .next_record()
        .unwrap_err();
    assert!(matches!(err, DecodeError::Format { .. }));
}

#[test]
fn test_second_record_error_offset_is_absolute() {
    let mut data = vec![0x2B, b'f', b'o', b'o', 1, 0, 0, 0];
    data.extend_from_slice(&[0x09, b'x', 0x05, b'a']);

    let mut reader = Deserializer::new(&data);
    reader.next_record().unwrap();
    let err = reader.next_record().unwrap_err();
    assert!(err.offset() >= 8, "offset {} should point into the second record", err.offset());
}
