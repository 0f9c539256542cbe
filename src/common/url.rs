use url::Url;

/// Appends path segments to `base`, splitting each part on `/` and dropping
/// empty pieces so callers can pass folder-like strings verbatim.
pub fn join_path(base: &Url, parts: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
        for part in parts {
            segments.extend(part.split('/').filter(|s| !s.is_empty()));
        }
    }
    url
}

/// Same as [`join_path`] but keeps a trailing slash, for folder URLs.
pub fn join_folder(base: &Url, parts: &[&str]) -> Url {
    let mut url = join_path(base, parts);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push("");
    }
    url
}

/// Replaces the first label of the host with `subdomain`. Hosts with two or
/// fewer labels get the subdomain prepended instead.
pub fn replace_subdomain(start: &Url, subdomain: &str) -> Url {
    let Some(host) = start.host_str() else {
        return start.clone();
    };
    let mut labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 {
        labels[0] = subdomain;
    } else {
        labels.insert(0, subdomain);
    }
    let new_host = labels.join(".");
    let mut url = start.clone();
    if url.set_host(Some(&new_host)).is_err() {
        return start.clone();
    }
    url
}
