use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общий интерфейс ошибок BFlat, пригодный для `dyn`.
///
/// Даёт статус-код, безопасное сообщение для внешнего потребителя и поля
/// для структурированных логов.
pub trait ErrorExt: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode;

    /// Нужен для `StackError::downcast_ref`.
    fn as_any(&self) -> &dyn Any;

    /// Текст для пользователя. Внутренние ошибки не раскрывают деталей.
    fn client_message(&self) -> String {
        if matches!(
            self.status_code(),
            StatusCode::Unknown | StatusCode::Internal | StatusCode::Unexpected
        ) {
            return "Internal error".to_string();
        }
        self.to_string()
    }

    /// Пары ключ-значение для полей `tracing`.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let code = self.status_code();
        vec![
            ("error_type", self.type_name().to_string()),
            ("status", format!("{code:?}")),
            ("code", code.code().to_string()),
        ]
    }

    /// Короткое имя типа без пути модуля.
    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}
