//! Shared building blocks for the registry admin workspace:
//! logging setup, startup environment checks and small wire types.

pub mod types;
pub mod utils;
pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn service_info_serializes() {
        let info = types::ServiceInfo { status: "healthy", service: "svc", version: "1.0.0" };
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["status"], "healthy");
        assert_eq!(v["version"], "1.0.0");
    }
}
