//! The activities API: wire types, errors, and the calls themselves.
//!
//! Each call splits into a fetch (browser only) and a pure step that turns
//! `(ok, status, body)` into a typed result, so the response handling can be
//! tested without a browser.

use std::fmt;

use gloo_net::http::{Request, Response};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;
use urlencoding::encode;

/// One entry of `GET /activities`, keyed by the activity name.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ActivityDetails {
    pub description: String,
    pub schedule: String,
    pub max_participants: u32,
    pub participants: Vec<String>,
}

impl ActivityDetails {
    /// Capacity minus enrollment. Goes negative when the server overfills.
    pub fn spots_left(&self) -> i64 {
        i64::from(self.max_participants) - self.participants.len() as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub name: String,
    pub details: ActivityDetails,
}

/// Activities in the order the server listed them.
///
/// The wire format is a JSON object, so this deserializes the map by hand
/// instead of going through a `HashMap` and losing the order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySet(Vec<Activity>);

impl ActivitySet {
    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'de> Deserialize<'de> for ActivitySet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = ActivitySet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of activity name to activity details")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut items = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, details)) = map.next_entry::<String, ActivityDetails>()? {
                    items.push(Activity { name, details });
                }
                Ok(ActivitySet(items))
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}

/// Body of both mutation endpoints: `{message}` on success, `{detail}` otherwise.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ApiReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The fetch itself never produced a response.
    #[error("network error: {0}")]
    Network(String),
    /// A response arrived but its body was not the JSON we expected.
    #[error("malformed response: {0}")]
    Decode(String),
    /// Non-2xx status. `detail` is the server's message when it sent one.
    #[error("request rejected (HTTP {status}){}", detail_suffix(.detail))]
    Rejected { status: u16, detail: Option<String> },
}

impl ClientError {
    /// Banner text for this error: the server's detail if there is one,
    /// otherwise `fallback`.
    pub fn banner_text(&self, fallback: &str) -> String {
        match self {
            ClientError::Rejected {
                detail: Some(detail),
                ..
            } if !detail.is_empty() => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivitiesApi {
    base: String,
}

impl ActivitiesApi {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn activities_url(&self) -> String {
        format!("{}/activities", self.base)
    }

    pub fn signup_url(&self, activity: &str, email: &str) -> String {
        format!(
            "{}/activities/{}/signup?email={}",
            self.base,
            encode(activity),
            encode(email)
        )
    }

    pub fn participant_url(&self, activity: &str, email: &str) -> String {
        format!(
            "{}/activities/{}/participants/{}",
            self.base,
            encode(activity),
            encode(email)
        )
    }

    /// `GET /activities`
    pub async fn fetch_activities(&self) -> Result<ActivitySet, ClientError> {
        let resp = Request::get(&self.activities_url())
            .send()
            .await
            .map_err(network)?;
        let (ok, status, body) = read(resp).await?;
        parse_listing(ok, status, &body)
    }

    /// `POST /activities/{activity}/signup?email={email}`
    ///
    /// Returns the server's success message, if it sent one.
    pub async fn sign_up(
        &self,
        activity: &str,
        email: &str,
    ) -> Result<Option<String>, ClientError> {
        let resp = Request::post(&self.signup_url(activity, email))
            .send()
            .await
            .map_err(network)?;
        let (ok, status, body) = read(resp).await?;
        parse_reply(ok, status, &body)
    }

    /// `DELETE /activities/{activity}/participants/{email}`
    pub async fn remove_participant(
        &self,
        activity: &str,
        email: &str,
    ) -> Result<Option<String>, ClientError> {
        let resp = Request::delete(&self.participant_url(activity, email))
            .send()
            .await
            .map_err(network)?;
        let (ok, status, body) = read(resp).await?;
        parse_reply(ok, status, &body)
    }
}

fn network(e: gloo_net::Error) -> ClientError {
    ClientError::Network(e.to_string())
}

async fn read(resp: Response) -> Result<(bool, u16, String), ClientError> {
    let ok = resp.ok();
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok((ok, status, body))
}

/// A failed listing still tries to surface `{detail}`; an unreadable error
/// body is reported as the rejection it is.
pub fn parse_listing(ok: bool, status: u16, body: &str) -> Result<ActivitySet, ClientError> {
    if ok {
        return Ok(serde_json::from_str(body)?);
    }
    let detail = serde_json::from_str::<ApiReply>(body)
        .ok()
        .and_then(|r| r.detail);
    Err(ClientError::Rejected { status, detail })
}

/// Mutation replies must be JSON either way. A body that isn't counts as a
/// malformed response, not as a rejection.
pub fn parse_reply(ok: bool, status: u16, body: &str) -> Result<Option<String>, ClientError> {
    let reply: ApiReply = serde_json::from_str(body)?;
    if ok {
        Ok(reply.message)
    } else {
        Err(ClientError::Rejected {
            status,
            detail: reply.detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD_JSON: &str = r#"{
        "Chess Club": {
            "description": "Learn strategies and compete in chess tournaments",
            "schedule": "Fridays, 3:30 PM - 5:00 PM",
            "max_participants": 12,
            "participants": ["michael@mergington.edu", "daniel@mergington.edu"]
        },
        "Art Studio": {
            "description": "Painting and drawing",
            "schedule": "Wednesdays, 3:30 PM - 5:00 PM",
            "max_participants": 1,
            "participants": []
        }
    }"#;

    fn find<'a>(set: &'a ActivitySet, name: &str) -> &'a ActivityDetails {
        &set.iter().find(|a| a.name == name).unwrap().details
    }

    #[test]
    fn keeps_server_order() {
        let set: ActivitySet = serde_json::from_str(BOARD_JSON).unwrap();
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, vec!["Chess Club", "Art Studio"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn keeps_participant_order() {
        let set: ActivitySet = serde_json::from_str(BOARD_JSON).unwrap();
        assert_eq!(
            find(&set, "Chess Club").participants,
            vec!["michael@mergington.edu", "daniel@mergington.edu"]
        );
    }

    #[test]
    fn spots_left_is_capacity_minus_enrollment() {
        let set: ActivitySet = serde_json::from_str(BOARD_JSON).unwrap();
        assert_eq!(find(&set, "Chess Club").spots_left(), 10);
        assert_eq!(find(&set, "Art Studio").spots_left(), 1);
    }

    #[test]
    fn spots_left_goes_negative_when_overfilled() {
        let details = ActivityDetails {
            description: String::new(),
            schedule: String::new(),
            max_participants: 1,
            participants: vec!["a@x.edu".into(), "b@x.edu".into(), "c@x.edu".into()],
        };
        assert_eq!(details.spots_left(), -2);
    }

    #[test]
    fn empty_object_is_empty_set() {
        let set: ActivitySet = serde_json::from_str("{}").unwrap();
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn missing_participants_is_a_decode_error() {
        let json = r#"{"Chess": {"description": "", "schedule": "", "max_participants": 3}}"#;
        assert!(serde_json::from_str::<ActivitySet>(json).is_err());
    }

    #[test]
    fn array_body_is_a_decode_error() {
        assert!(serde_json::from_str::<ActivitySet>("[]").is_err());
    }

    #[test]
    fn reply_fields_are_optional() {
        let reply: ApiReply = serde_json::from_str(r#"{"detail": "Activity full"}"#).unwrap();
        assert_eq!(reply.detail.as_deref(), Some("Activity full"));
        assert_eq!(reply.message, None);

        let reply: ApiReply = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert_eq!(reply, ApiReply::default());
    }

    #[test]
    fn rejected_with_detail_shows_detail() {
        let err = ClientError::Rejected {
            status: 400,
            detail: Some("Activity full".into()),
        };
        assert_eq!(err.banner_text("An error occurred"), "Activity full");
    }

    #[test]
    fn rejected_without_detail_falls_back() {
        let err = ClientError::Rejected {
            status: 500,
            detail: None,
        };
        assert_eq!(err.banner_text("An error occurred"), "An error occurred");

        let err = ClientError::Rejected {
            status: 500,
            detail: Some(String::new()),
        };
        assert_eq!(err.banner_text("An error occurred"), "An error occurred");
    }

    #[test]
    fn transport_and_decode_failures_fall_back() {
        let fallback = "Failed to sign up. Please try again.";
        assert_eq!(
            ClientError::Network("Failed to fetch".into()).banner_text(fallback),
            fallback
        );
        let decode: ClientError = serde_json::from_str::<u8>("<html>").unwrap_err().into();
        assert!(matches!(decode, ClientError::Decode(_)));
        assert_eq!(decode.banner_text(fallback), fallback);
    }

    #[test]
    fn display_includes_status_and_detail() {
        let err = ClientError::Rejected {
            status: 404,
            detail: Some("Participant not registered for this activity".into()),
        };
        assert_eq!(
            err.to_string(),
            "request rejected (HTTP 404): Participant not registered for this activity"
        );
        let err = ClientError::Rejected {
            status: 502,
            detail: None,
        };
        assert_eq!(err.to_string(), "request rejected (HTTP 502)");
    }

    #[test]
    fn same_origin_paths() {
        let api = ActivitiesApi::new("");
        assert_eq!(api.activities_url(), "/activities");
        assert_eq!(
            api.signup_url("Chess Club", "a@b.edu"),
            "/activities/Chess%20Club/signup?email=a%40b.edu"
        );
        assert_eq!(
            api.participant_url("Chess Club", "a@b.edu"),
            "/activities/Chess%20Club/participants/a%40b.edu"
        );
    }

    #[test]
    fn base_trailing_slash_is_dropped() {
        let api = ActivitiesApi::new("https://school.example/api/");
        assert_eq!(api.activities_url(), "https://school.example/api/activities");
    }

    #[test]
    fn reserved_characters_are_encoded() {
        let api = ActivitiesApi::new("");
        assert_eq!(
            api.signup_url("Art/Design & Co?", "x+y@b.edu"),
            "/activities/Art%2FDesign%20%26%20Co%3F/signup?email=x%2By%40b.edu"
        );
        assert_eq!(
            api.participant_url("Math#1", "o'neil@b.edu"),
            "/activities/Math%231/participants/o%27neil%40b.edu"
        );
    }

    #[test]
    fn listing_success_decodes_set() {
        let body = r#"{"Chess Club": {"description": "d", "schedule": "s", "max_participants": 2, "participants": []}}"#;
        let set = parse_listing(true, 200, body).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Chess Club"]);
    }

    #[test]
    fn listing_garbage_is_decode_error() {
        let err = parse_listing(true, 200, "<!doctype html>").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn listing_error_status_is_rejected() {
        let err = parse_listing(false, 503, "Service Unavailable").unwrap_err();
        assert_eq!(
            err,
            ClientError::Rejected {
                status: 503,
                detail: None
            }
        );
        let err = parse_listing(false, 500, r#"{"detail": "db down"}"#).unwrap_err();
        assert_eq!(
            err,
            ClientError::Rejected {
                status: 500,
                detail: Some("db down".into())
            }
        );
    }

    #[test]
    fn reply_success_returns_message() {
        let msg = parse_reply(true, 200, r#"{"message": "Signed up!"}"#).unwrap();
        assert_eq!(msg.as_deref(), Some("Signed up!"));
    }

    #[test]
    fn reply_failure_carries_detail() {
        let err = parse_reply(false, 400, r#"{"detail": "Activity full"}"#).unwrap_err();
        assert_eq!(err.banner_text("An error occurred"), "Activity full");
    }

    #[test]
    fn reply_failure_without_detail_uses_fallback() {
        let err = parse_reply(false, 400, "{}").unwrap_err();
        assert!(matches!(err, ClientError::Rejected { status: 400, detail: None }));
        assert_eq!(err.banner_text("An error occurred"), "An error occurred");
    }

    #[test]
    fn reply_non_json_is_decode_error_even_on_failure() {
        let err = parse_reply(false, 502, "Bad Gateway").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
