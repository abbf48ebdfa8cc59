use std::process::Command;

pub(crate) const HOSTNAME_SUFFIX: &str = "-pc";

// The credentials used both to filter assigned issues and to authenticate
// write-backs. A single value flows to both places so they cannot diverge.
#[derive(Debug, Clone)]
pub(crate) struct RunIdentity {
    user: String,
    password: String,
}

impl RunIdentity {
    pub(crate) fn resolve(
        user: Option<String>,
        password: Option<String>,
        use_hostname: bool,
        use_hostname_pc: bool,
        down_case: bool,
    ) -> Result<Self, String> {
        let mut user = user.unwrap_or_default();
        let mut password = password.unwrap_or_default();

        if use_hostname {
            user = hostname()?;
        }
        if use_hostname_pc {
            if user.is_empty() {
                user = hostname()?;
            }
            user.push_str(HOSTNAME_SUFFIX);
            password = user.clone();
        }
        if down_case {
            user = user.to_lowercase();
            password = password.to_lowercase();
        }

        Ok(Self { user, password })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(user: &str, password: &str) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    pub(crate) fn user(&self) -> &str {
        &self.user
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

fn hostname() -> Result<String, String> {
    let output = Command::new("hostname")
        .output()
        .map_err(|err| format!("Failed to run hostname: {}", err))?;
    if !output.status.success() {
        return Err(format!(
            "hostname exited with code {}",
            output.status.code().unwrap_or(1)
        ));
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if name.is_empty() {
        return Err("hostname produced no output".to_string());
    }
    Ok(name)
}
