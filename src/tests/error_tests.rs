#[cfg(test)]
mod tests {
    use std::io;

    use crate::error::{validation, ClientError, ClientResult, OptionExt};

    #[test]
    fn test_client_error_display() {
        let error = ClientError::InvalidInput("bad folder id".to_string());
        assert_eq!(format!("{}", error), "Invalid input: bad folder id");

        let error = ClientError::NotFound("Item not found".to_string());
        assert_eq!(format!("{}", error), "Not found: Item not found");

        let error = ClientError::RateLimited { retry_after_seconds: 60 };
        assert_eq!(format!("{}", error), "Rate limited. Retry after 60 seconds");

        let error = ClientError::Http { status: 502, message: "bad gateway".into() };
        assert_eq!(format!("{}", error), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(ClientError::from_status(401, ""), ClientError::Unauthorized(_)));
        assert!(matches!(ClientError::from_status(403, ""), ClientError::PermissionDenied(_)));
        assert!(matches!(ClientError::from_status(404, ""), ClientError::NotFound(_)));
        assert!(matches!(
            ClientError::from_status(429, r#"{"retry_after_seconds":30}"#),
            ClientError::RateLimited { retry_after_seconds: 30 }
        ));
        assert!(matches!(ClientError::from_status(429, ""), ClientError::RateLimited { retry_after_seconds: 1 }));
    }

    #[test]
    fn test_message_extraction() {
        match ClientError::from_status(400, r#"{"message":"Name already exists"}"#) {
            ClientError::Http { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Name already exists");
            }
            other => panic!("Expected Http variant, got {:?}", other),
        }

        match ClientError::from_status(500, r#"{"error":{"message":"disk full"}}"#) {
            ClientError::Http { message, .. } => assert_eq!(message, "disk full"),
            other => panic!("Expected Http variant, got {:?}", other),
        }

        match ClientError::from_status(503, "  upstream down \n") {
            ClientError::Http { message, .. } => assert_eq!(message, "upstream down"),
            other => panic!("Expected Http variant, got {:?}", other),
        }

        match ClientError::from_status(500, "") {
            ClientError::Http { message, .. } => assert_eq!(message, "HTTP error 500"),
            other => panic!("Expected Http variant, got {:?}", other),
        }
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            ClientError::Http { status: 409, message: "Name already exists".into() }.user_message(),
            "Name already exists"
        );
        assert!(ClientError::NotLoggedIn.user_message().contains("log in"));
        assert!(ClientError::from_status(401, "").is_auth());
        assert!(!ClientError::from_status(500, "").is_auth());
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let client_error: ClientError = io_error.into();

        match client_error {
            ClientError::Io(msg) => {
                assert!(msg.contains("not found") || msg.contains("NotFound"));
                assert!(msg.contains("File not found"));
            }
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_from_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ClientError::from(err), ClientError::Decode(_)));
    }

    #[test]
    fn test_option_ext() {
        let some_value: Option<i32> = Some(42);
        let result: ClientResult<i32> = some_value.ok_or_not_found("Item");
        assert_eq!(result.unwrap(), 42);

        let none_value: Option<i32> = None;
        match none_value.ok_or_not_found("Item") {
            Err(ClientError::NotFound(msg)) => assert_eq!(msg, "Item not found"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_validate_item_name() {
        assert!(validation::validate_item_name("Quarterly report.docx").is_ok());
        assert!(validation::validate_item_name("").is_err());
        assert!(validation::validate_item_name("   ").is_err());
        assert!(validation::validate_item_name("a/b").is_err());
        assert!(validation::validate_item_name("a\0b").is_err());
        assert!(validation::validate_item_name(&"x".repeat(256)).is_err());
        assert!(validation::validate_item_name(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn test_validate_email() {
        assert!(validation::validate_email("bob@example.com").is_ok());
        assert!(validation::validate_email(" bob@example.com ").is_ok());
        for bad in ["", "bob", "@example.com", "bob@example", "bob@@example.com", "bob@.com", "bo b@example.com"] {
            assert!(validation::validate_email(bad).is_err(), "{:?} accepted", bad);
        }
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validation::validate_positive_number(None, "size").is_ok());
        assert!(validation::validate_positive_number(Some(10), "size").is_ok());
        match validation::validate_positive_number(Some(0), "size") {
            Err(ClientError::ValidationError { field, .. }) => assert_eq!(field, "size"),
            _ => panic!("Expected ValidationError"),
        }
    }
}
