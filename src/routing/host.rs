use hyper::{header, HeaderMap, Uri};

/// 요청의 호스트 정보를 담는 불변 데이터 구조입니다.
///
/// # 필드
///
/// * `name` - 소문자로 정규화된 호스트 이름 (예: "example.com")
/// * `port` - 선택적 포트 번호
#[derive(Clone, Debug, PartialEq)]
pub struct HostInfo {
    pub name: String,
    pub port: Option<u16>,
}

impl HostInfo {
    /// 호스트 헤더 값에서 HostInfo를 생성합니다.
    ///
    /// 형식이 잘못된 값이면 `None`을 반환합니다.
    ///
    /// # 예제
    ///
    /// ```
    /// use reverse_proxy_gateway::routing::HostInfo;
    ///
    /// let host_info = HostInfo::from_header_value("Example.com:8080").unwrap();
    /// assert_eq!(host_info.name, "example.com");
    /// assert_eq!(host_info.port, Some(8080));
    /// ```
    pub fn from_header_value(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        // IPv6 리터럴: [::1]:8080
        if let Some(rest) = value.strip_prefix('[') {
            let (addr, tail) = rest.split_once(']')?;
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(Self::parse_port(port)?),
                None if tail.is_empty() => None,
                None => return None,
            };
            return Some(HostInfo {
                name: addr.to_ascii_lowercase(),
                port,
            });
        }

        match value.split_once(':') {
            None => Some(HostInfo {
                name: value.to_ascii_lowercase(),
                port: None,
            }),
            Some((name, port)) => {
                if name.is_empty() {
                    return None;
                }
                Some(HostInfo {
                    name: name.to_ascii_lowercase(),
                    port: Some(Self::parse_port(port)?),
                })
            }
        }
    }

    /// Host 헤더를 우선 사용하고, 없으면 URI authority에서 추출합니다.
    pub fn from_parts(uri: &Uri, headers: &HeaderMap) -> Option<Self> {
        if let Some(value) = headers.get(header::HOST) {
            return value.to_str().ok().and_then(Self::from_header_value);
        }
        uri.authority().and_then(|authority| Self::from_header_value(authority.as_str()))
    }

    fn parse_port(port: &str) -> Option<u16> {
        match port.parse::<u16>() {
            Ok(0) | Err(_) => None,
            Ok(port) => Some(port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_without_port() {
        let info = HostInfo::from_header_value("a.com").unwrap();
        assert_eq!(info, HostInfo { name: "a.com".into(), port: None });
    }

    #[test]
    fn test_invalid_hosts() {
        assert!(HostInfo::from_header_value("").is_none());
        assert!(HostInfo::from_header_value(":8080").is_none());
        assert!(HostInfo::from_header_value("a.com:0").is_none());
        assert!(HostInfo::from_header_value("a.com:port").is_none());
    }

    #[test]
    fn test_ipv6_host() {
        let info = HostInfo::from_header_value("[::1]:8080").unwrap();
        assert_eq!(info.name, "::1");
        assert_eq!(info.port, Some(8080));
    }

    #[test]
    fn test_host_from_uri_authority() {
        let uri: Uri = "http://b.com:81/x".parse().unwrap();
        let info = HostInfo::from_parts(&uri, &HeaderMap::new()).unwrap();
        assert_eq!(info.name, "b.com");
        assert_eq!(info.port, Some(81));
    }
}
