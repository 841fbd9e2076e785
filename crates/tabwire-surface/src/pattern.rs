//! URL match patterns
//!
//! `<scheme>://<host><path>` as used by extension APIs, plus `<all_urls>`.
//! - scheme: `*` (http or https), `http`, `https`, `file`, `ftp`, `ws`, `wss`
//! - host: `*`, `*.example.com` (the domain and its subdomains) or an exact
//!   host, optionally followed by `:port`
//! - path: glob where `*` matches any run of characters; matched against
//!   path plus query

use std::net::Ipv6Addr;

use url::Url;

use crate::error::SurfaceError;
use crate::Result;

const SCHEMES: &[&str] = &["http", "https", "file", "ftp", "ws", "wss"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scheme {
    HttpOrHttps,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Host {
    Any,
    Subdomain(String),
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    AllUrls,
    Parts {
        scheme: Scheme,
        host: Host,
        port: Option<u16>,
        path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    raw: String,
    pattern: Pattern,
}

impl UrlPattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| SurfaceError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw == "<all_urls>" {
            return Ok(Self {
                raw: raw.to_string(),
                pattern: Pattern::AllUrls,
            });
        }

        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| invalid("Missing scheme separator"))?;

        let scheme = match scheme {
            "*" => Scheme::HttpOrHttps,
            s if SCHEMES.contains(&s) => Scheme::Exact(s.to_string()),
            _ => return Err(invalid("Invalid scheme")),
        };

        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => return Err(invalid("Empty path")),
        };

        let (host, port) = split_port(authority).ok_or_else(|| invalid("Invalid IPv6 host"))?;
        let port = match port {
            None | Some("*") => None,
            Some(port) => Some(port.parse::<u16>().map_err(|_| invalid("Invalid port"))?),
        };

        let host = if let Some(literal) = host.strip_prefix('[') {
            let addr = literal
                .trim_end_matches(']')
                .parse::<Ipv6Addr>()
                .map_err(|_| invalid("Invalid IPv6 host"))?;
            Host::Exact(format!("[{addr}]"))
        } else if host == "*" {
            Host::Any
        } else if let Some(domain) = host.strip_prefix("*.") {
            if domain.contains('*') {
                return Err(invalid("Invalid host wildcard"));
            }
            Host::Subdomain(domain.to_ascii_lowercase())
        } else if host.contains('*') {
            return Err(invalid("Invalid host wildcard"));
        } else if host.is_empty() && scheme != Scheme::Exact("file".to_string()) {
            return Err(invalid("Empty host"));
        } else {
            Host::Exact(host.to_ascii_lowercase())
        };

        Ok(Self {
            raw: raw.to_string(),
            pattern: Pattern::Parts {
                scheme,
                host,
                port,
                path: path.to_string(),
            },
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `url` is matched. Unparseable URLs never match.
    pub fn matches(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };

        match &self.pattern {
            Pattern::AllUrls => SCHEMES.contains(&url.scheme()),
            Pattern::Parts {
                scheme,
                host,
                port,
                path,
            } => {
                let scheme_ok = match scheme {
                    Scheme::HttpOrHttps => matches!(url.scheme(), "http" | "https"),
                    Scheme::Exact(s) => url.scheme() == s,
                };
                if !scheme_ok {
                    return false;
                }

                let url_host = url.host_str().unwrap_or("").to_ascii_lowercase();
                let host_ok = match host {
                    Host::Any => true,
                    Host::Exact(h) => url_host == *h,
                    Host::Subdomain(domain) => {
                        url_host == *domain || url_host.ends_with(&format!(".{domain}"))
                    }
                };
                if !host_ok {
                    return false;
                }

                if let Some(port) = port {
                    if url.port_or_known_default() != Some(*port) {
                        return false;
                    }
                }

                let mut target = url.path().to_string();
                if let Some(query) = url.query() {
                    target.push('?');
                    target.push_str(query);
                }
                glob_match(path, &target)
            }
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split `host[:port]`. A bracketed IPv6 host only takes a port after `]`.
fn split_port(authority: &str) -> Option<(&str, Option<&str>)> {
    if authority.starts_with('[') {
        let end = authority.find(']')? + 1;
        let (host, rest) = authority.split_at(end);
        return match rest {
            "" => Some((host, None)),
            _ => Some((host, Some(rest.strip_prefix(':')?))),
        };
    }
    Some(match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    })
}

/// `*` matches any run of characters, everything else matches literally.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star_pi, star_ti)) = star {
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
