pub mod callback;
pub mod command;

use chk_db::models::order::OrderStatus;

use crate::services::order_service::ServiceError;

/// User-facing text for a failed order operation. Internal errors are
/// logged here and shown as a generic apology.
pub(crate) fn service_error_text(e: &ServiceError) -> String {
    match e {
        ServiceError::NotFound => "❌ No se encontró la orden.".to_string(),
        ServiceError::InvalidState(status) => {
            let label = OrderStatus::parse(status)
                .map(|s| s.display_es())
                .unwrap_or("desconocido");
            format!("⚠️ La orden ya está en estado: {}", label)
        }
        ServiceError::Forbidden => "⛔ No tienes permiso para esta acción.".to_string(),
        ServiceError::Validation(msg) => format!("⚠️ {}", msg),
        ServiceError::Other(e) => {
            tracing::error!("Order operation failed: {:#}", e);
            "❌ Ocurrió un error, intenta de nuevo más tarde.".to_string()
        }
    }
}
