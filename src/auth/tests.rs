use super::*;
use axum::http::HeaderMap;

fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        headers.insert(*name, value.parse().unwrap());
    }
    headers
}

mod extract_api_key_tests {
    use super::*;

    #[test]
    fn x_api_key_header() {
        let h = headers(&[("x-api-key", "gh-secret")]);
        assert_eq!(extract_api_key(&h), Ok("gh-secret".to_string()));
    }

    #[test]
    fn x_api_key_trimmed() {
        let h = headers(&[("x-api-key", "  gh-secret ")]);
        assert_eq!(extract_api_key(&h), Ok("gh-secret".to_string()));
    }

    #[test]
    fn x_api_key_wins_over_bearer() {
        let h = headers(&[("x-api-key", "from-header"), ("authorization", "Bearer other")]);
        assert_eq!(extract_api_key(&h), Ok("from-header".to_string()));
    }

    #[test]
    fn bearer_fallback_case_insensitive() {
        let h = headers(&[("authorization", "bearer gh-secret")]);
        assert_eq!(extract_api_key(&h), Ok("gh-secret".to_string()));
    }

    #[test]
    fn missing_headers() {
        assert_eq!(extract_api_key(&HeaderMap::new()), Err(KeyError::Missing));
    }

    #[test]
    fn empty_x_api_key() {
        let h = headers(&[("x-api-key", "")]);
        assert_eq!(extract_api_key(&h), Err(KeyError::Empty));
    }

    #[test]
    fn wrong_scheme() {
        let h = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_api_key(&h), Err(KeyError::InvalidFormat));
    }

    #[test]
    fn bearer_without_token() {
        let h = headers(&[("authorization", "Bearer")]);
        assert_eq!(extract_api_key(&h), Err(KeyError::InvalidFormat));

        let h = headers(&[("authorization", "Bearer   ")]);
        assert_eq!(extract_api_key(&h), Err(KeyError::Empty));
    }
}

mod verify_api_key_tests {
    use super::*;

    #[test]
    fn matching_key() {
        let h = headers(&[("x-api-key", "gh-secret")]);
        assert!(verify_api_key(&h, "gh-secret").is_ok());
    }

    #[test]
    fn mismatched_key() {
        let h = headers(&[("x-api-key", "gh-secreT")]);
        assert_eq!(verify_api_key(&h, "gh-secret"), Err(KeyError::Mismatch));
    }

    #[test]
    fn prefix_is_not_enough() {
        let h = headers(&[("x-api-key", "gh-sec")]);
        assert_eq!(verify_api_key(&h, "gh-secret"), Err(KeyError::Mismatch));
    }

    #[test]
    fn missing_key() {
        assert_eq!(
            verify_api_key(&HeaderMap::new(), "gh-secret"),
            Err(KeyError::Missing)
        );
    }
}

#[test]
fn error_display() {
    assert_eq!(KeyError::Missing.to_string(), "API key not provided");
    assert_eq!(KeyError::Mismatch.to_string(), "API key rejected");
}
