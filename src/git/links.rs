use regex::Regex;

/// Turns a clone's remote URL into browsable GitHub links.
pub struct RepositoryLinker<'a> {
    remote_url: &'a str,
}

impl<'a> RepositoryLinker<'a> {
    pub fn new(remote_url: &'a str) -> Self {
        Self { remote_url }
    }

    pub fn get_base_url(&self) -> Option<String> {
        let url = if self.remote_url.starts_with("git@") {
            convert_ssh_to_https(self.remote_url)?
        } else {
            self.remote_url.to_string()
        };

        let url = url.trim_end_matches('/');
        let url = url.strip_suffix(".git").unwrap_or(url);
        Some(url.to_string())
    }

    /// `owner/name` when the remote points at github.com.
    pub fn github_full_name(&self) -> Option<String> {
        let base = self.get_base_url()?;
        let re = Regex::new(r"^https?://(?:[^@/]+@)?github\.com/([^/]+)/([^/]+)$").ok()?;
        let captures = re.captures(&base)?;
        Some(format!(
            "{}/{}",
            captures.get(1)?.as_str(),
            captures.get(2)?.as_str()
        ))
    }
}

fn convert_ssh_to_https(ssh_url: &str) -> Option<String> {
    // git@hostname:owner/repo.git -> https://hostname/owner/repo
    let re = Regex::new(r"git@([^:]+):(.+)").ok()?;
    let captures = re.captures(ssh_url)?;
    let hostname = captures.get(1)?.as_str();
    let path = captures.get(2)?.as_str();
    let path = path.strip_suffix(".git").unwrap_or(path);
    Some(format!("https://{}/{}", hostname, path))
}

pub fn repository_url(full_name: &str) -> String {
    format!("https://github.com/{}", full_name)
}
