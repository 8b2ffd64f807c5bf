use url::Url;

/// Builds the URL of a job, expanding folder paths.
///
/// # Arguments
///
/// * `base_url` - Jenkins base URL ending in `/` (e.g., <https://ci.example.com/>)
/// * `job` - Job name, folders separated by `/` (e.g., "team/app-build")
///
/// # Returns
///
/// Job URL with a trailing slash (e.g., <https://ci.example.com/job/team/job/app-build/>)
pub fn job_url(base_url: &Url, job: &str) -> Url {
    let mut url = base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
        for name in job.split('/').filter(|s| !s.is_empty()) {
            segments.push("job").push(name);
        }
        segments.push("");
    }
    url
}

/// Builds the URL of a numbered build (e.g., <https://ci.example.com/job/app-build/17/>).
pub fn build_url(base_url: &Url, job: &str, number: u64) -> Url {
    let mut url = job_url(base_url, job);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(&number.to_string()).push("");
    }
    url
}

/// Builds the URL of a queue item (e.g., <https://ci.example.com/queue/item/42/>).
pub fn queue_item_url(base_url: &Url, id: u64) -> Url {
    let mut url = base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(["queue", "item", &id.to_string(), ""]);
    }
    url
}

/// Extracts the queue id from the `Location` header Jenkins returns for a trigger.
///
/// `https://ci.example.com/queue/item/42/` yields `42`.
pub fn queue_id_from_location(location: &str) -> Option<u64> {
    let path = location.trim_end_matches('/');
    let (rest, id) = path.rsplit_once('/')?;
    if !rest.ends_with("queue/item") {
        return None;
    }
    id.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://ci.example.com/jenkins/").unwrap()
    }

    #[test]
    fn test_job_url_plain() {
        assert_eq!(
            job_url(&base(), "app-build").as_str(),
            "https://ci.example.com/jenkins/job/app-build/"
        );
    }

    #[test]
    fn test_job_url_folder() {
        assert_eq!(
            job_url(&base(), "team/app-build").as_str(),
            "https://ci.example.com/jenkins/job/team/job/app-build/"
        );
    }

    #[test]
    fn test_job_url_escapes_spaces() {
        assert_eq!(
            job_url(&base(), "nightly tests").as_str(),
            "https://ci.example.com/jenkins/job/nightly%20tests/"
        );
    }

    #[test]
    fn test_build_url() {
        assert_eq!(
            build_url(&base(), "app-build", 17).as_str(),
            "https://ci.example.com/jenkins/job/app-build/17/"
        );
    }

    #[test]
    fn test_queue_item_url() {
        assert_eq!(
            queue_item_url(&base(), 42).as_str(),
            "https://ci.example.com/jenkins/queue/item/42/"
        );
    }

    #[test]
    fn test_queue_id_from_location() {
        assert_eq!(
            queue_id_from_location("https://ci.example.com/queue/item/42/"),
            Some(42)
        );
        assert_eq!(
            queue_id_from_location("https://ci.example.com/queue/item/7"),
            Some(7)
        );
        assert_eq!(
            queue_id_from_location("https://ci.example.com/job/x/"),
            None
        );
        assert_eq!(
            queue_id_from_location("https://ci.example.com/queue/item/abc/"),
            None
        );
    }
}
