use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::identity::RunIdentity;
use crate::issue::{EnumRef, Issue};
use crate::reconcile::IssueNote;

pub(crate) const MIN_SUPPORTED_VERSION: &str = "1.2.3";

#[derive(Debug, Error)]
pub(crate) enum TrackerError {
    #[error("tracker rejected credentials: HTTP {0}")]
    Auth(u16),
    #[error("tracker request failed: {0}")]
    Transport(String),
    #[error("{0}")]
    NotFound(String),
    #[error("failed to parse tracker response: {0}")]
    Parse(String),
}

// The tracker is an opaque synchronous collaborator: it returns data or
// fails. The identity is fixed at construction, so the same credentials that
// filtered the issues sign the write-backs.
pub(crate) trait Tracker {
    fn server_version(&self) -> Result<String, TrackerError>;
    fn find_project_id(&self, name: &str) -> Result<i64, TrackerError>;
    fn resolved_status(&self) -> Result<EnumRef, TrackerError>;
    fn fixed_resolution(&self) -> Result<EnumRef, TrackerError>;
    fn project_issues(&self, project_id: i64) -> Result<Vec<Issue>, TrackerError>;
    fn add_note(&self, issue_id: i64, note: &IssueNote) -> Result<(), TrackerError>;
    fn update_issue(&self, issue: &Issue) -> Result<(), TrackerError>;
}

pub(crate) struct MantisClient {
    base_url: String,
    authorization: String,
    debug: bool,
}

impl MantisClient {
    pub(crate) fn new(server: &str, identity: &RunIdentity, debug: bool) -> Self {
        let credentials = BASE64.encode(format!("{}:{}", identity.user(), identity.password()));
        Self {
            base_url: server.trim_end_matches('/').to_string(),
            authorization: format!("Basic {}", credentials),
            debug,
        }
    }

    fn get(&self, path: &str) -> Result<ureq::Response, TrackerError> {
        let url = format!("{}{}", self.base_url, path);
        map_response(
            ureq::get(&url)
                .set("Authorization", &self.authorization)
                .set("Accept", "application/json")
                .call(),
        )
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, TrackerError> {
        self.get(path)?
            .into_json()
            .map_err(|err| TrackerError::Parse(err.to_string()))
    }
}

impl Tracker for MantisClient {
    fn server_version(&self) -> Result<String, TrackerError> {
        let payload: VersionPayload = self.get_json("/api/rest/version")?;
        Ok(payload.version)
    }

    fn find_project_id(&self, name: &str) -> Result<i64, TrackerError> {
        let payload: ProjectsPayload = self.get_json("/api/rest/projects")?;
        if self.debug {
            println!("projects: {:?}", payload.projects);
        }
        payload
            .projects
            .iter()
            .find(|project| project.name.eq_ignore_ascii_case(name))
            .map(|project| project.id)
            .ok_or_else(|| TrackerError::NotFound(format!("Project \"{}\" for user not found", name)))
    }

    fn resolved_status(&self) -> Result<EnumRef, TrackerError> {
        let payload: StatusesPayload = self.get_json("/api/rest/enums/status")?;
        if self.debug {
            println!("statuses: {:?}", payload.statuses);
        }
        find_entry(payload.statuses, "resolved")
            .ok_or_else(|| TrackerError::NotFound("Status \"resolved\" not found".to_string()))
    }

    fn fixed_resolution(&self) -> Result<EnumRef, TrackerError> {
        let payload: ResolutionsPayload = self.get_json("/api/rest/enums/resolution")?;
        if self.debug {
            println!("resolutions: {:?}", payload.resolutions);
        }
        find_entry(payload.resolutions, "fixed")
            .ok_or_else(|| TrackerError::NotFound("Resolution \"fixed\" not found".to_string()))
    }

    fn project_issues(&self, project_id: i64) -> Result<Vec<Issue>, TrackerError> {
        let url = format!("{}/api/rest/issues", self.base_url);
        let response = map_response(
            ureq::get(&url)
                .query("project_id", &project_id.to_string())
                .set("Authorization", &self.authorization)
                .set("Accept", "application/json")
                .call(),
        )?;
        let payload: IssuesPayload = response
            .into_json()
            .map_err(|err| TrackerError::Parse(err.to_string()))?;
        Ok(payload.issues.into_iter().map(Issue::from).collect())
    }

    fn add_note(&self, issue_id: i64, note: &IssueNote) -> Result<(), TrackerError> {
        let url = format!("{}/api/rest/issues/{}/notes", self.base_url, issue_id);
        map_response(
            ureq::post(&url)
                .set("Authorization", &self.authorization)
                .set("Accept", "application/json")
                .send_json(json!({ "text": note.text })),
        )?;
        Ok(())
    }

    fn update_issue(&self, issue: &Issue) -> Result<(), TrackerError> {
        let url = format!("{}/api/rest/issues/{}", self.base_url, issue.id);
        map_response(
            ureq::request("PATCH", &url)
                .set("Authorization", &self.authorization)
                .set("Accept", "application/json")
                .send_json(json!({
                    "status": { "id": issue.status.id, "name": issue.status.name },
                    "resolution": { "id": issue.resolution.id, "name": issue.resolution.name },
                })),
        )?;
        Ok(())
    }
}

fn map_response(
    result: Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, TrackerError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(code @ (401 | 403), _)) => Err(TrackerError::Auth(code)),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(TrackerError::Transport(format!("HTTP {}: {}", code, body)))
        }
        Err(err) => Err(TrackerError::Transport(err.to_string())),
    }
}

fn find_entry(entries: Vec<EnumRef>, name: &str) -> Option<EnumRef> {
    entries
        .into_iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Deserialize)]
struct VersionPayload {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ProjectsPayload {
    projects: Vec<EnumRef>,
}

#[derive(Debug, Deserialize)]
struct StatusesPayload {
    statuses: Vec<EnumRef>,
}

#[derive(Debug, Deserialize)]
struct ResolutionsPayload {
    resolutions: Vec<EnumRef>,
}

#[derive(Debug, Deserialize)]
struct IssuesPayload {
    issues: Vec<IssueDto>,
}

#[derive(Debug, Deserialize)]
struct IssueDto {
    id: i64,
    summary: String,
    #[serde(default)]
    description: String,
    category: NameRef,
    #[serde(default)]
    handler: Option<NameRef>,
    status: EnumRef,
    resolution: EnumRef,
}

#[derive(Debug, Deserialize)]
struct NameRef {
    name: String,
}

impl From<IssueDto> for Issue {
    fn from(dto: IssueDto) -> Self {
        Issue {
            id: dto.id,
            summary: dto.summary,
            description: dto.description,
            category: dto.category.name,
            handler: dto.handler.map(|handler| handler.name),
            status: dto.status,
            resolution: dto.resolution,
        }
    }
}
