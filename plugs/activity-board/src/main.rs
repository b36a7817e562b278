mod api;
mod notice;

use gloo::console::{error, log};
use serde::Deserialize;
use wasm_bindgen_futures::spawn_local;
use web_sys::{window, HtmlFormElement, HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use api::{ActivitiesApi, Activity, ActivitySet, ClientError};
use notice::{use_notifier, NoticeKind, Notifier};

/// Id of the optional `<script type="application/json">` block in index.html.
const CONFIG_SCRIPT_ID: &str = "board-config";

const LOADING_TEXT: &str = "Loading activities...";
const LOAD_FAILED_TEXT: &str = "Failed to load activities. Please try again later.";
const SIGNUP_REJECTED_FALLBACK: &str = "An error occurred";
const SIGNUP_FAILED_TEXT: &str = "Failed to sign up. Please try again.";
const REMOVE_FAILED_FALLBACK: &str = "Failed to remove participant.";
const EMPTY_PARTICIPANTS_TEXT: &str = "Be the first to join!";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
struct BoardConfig {
    /// Prefix for every API path. Empty means same origin as the page.
    api_base: String,
    /// How long a banner stays up, in milliseconds.
    notice_ms: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            notice_ms: 5000,
        }
    }
}

impl BoardConfig {
    fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Missing block means defaults; a broken one is logged and also falls
    /// back to defaults.
    fn load() -> Self {
        let Some(text) = read_embedded_json(CONFIG_SCRIPT_ID) else {
            return Self::default();
        };
        match Self::from_json(&text) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(format!("Invalid #{CONFIG_SCRIPT_ID} block, using defaults: {e}"));
                Self::default()
            }
        }
    }
}

fn read_embedded_json(script_id: &str) -> Option<String> {
    let doc = window()?.document()?;
    let el = doc.get_element_by_id(script_id)?;
    let text = el.text_content()?;
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Board {
    Loading,
    Loaded(ActivitySet),
    Failed,
}

/// What the participants list of one card shows.
#[derive(Debug, PartialEq)]
enum Roster<'a> {
    Placeholder,
    Rows(&'a [String]),
}

fn roster(activity: &Activity) -> Roster<'_> {
    if activity.details.participants.is_empty() {
        Roster::Placeholder
    } else {
        Roster::Rows(&activity.details.participants)
    }
}

fn availability_text(activity: &Activity) -> String {
    format!(" {} spots left", activity.details.spots_left())
}

fn remove_label(activity: &str, email: &str) -> String {
    format!("Remove {email} from {activity}")
}

/// What the page does once a mutation settles.
#[derive(Debug, PartialEq)]
struct Outcome {
    banner: Option<(NoticeKind, String)>,
    reset_form: bool,
    refresh: bool,
}

/// A success reply without a message gets no banner at all.
fn success_banner(message: Option<String>) -> Option<(NoticeKind, String)> {
    message
        .filter(|m| !m.is_empty())
        .map(|m| (NoticeKind::Success, m))
}

/// A rejection shows the server's detail; anything that never got a proper
/// reply gets the generic sign-up failure.
fn signup_outcome(result: Result<Option<String>, ClientError>) -> Outcome {
    match result {
        Ok(message) => Outcome {
            banner: success_banner(message),
            reset_form: true,
            refresh: true,
        },
        Err(e) => {
            let text = match &e {
                ClientError::Rejected { .. } => e.banner_text(SIGNUP_REJECTED_FALLBACK),
                ClientError::Network(_) | ClientError::Decode(_) => SIGNUP_FAILED_TEXT.to_string(),
            };
            Outcome {
                banner: Some((NoticeKind::Error, text)),
                reset_form: false,
                refresh: false,
            }
        }
    }
}

fn removal_outcome(result: Result<Option<String>, ClientError>) -> Outcome {
    match result {
        Ok(message) => Outcome {
            banner: success_banner(message),
            reset_form: false,
            refresh: true,
        },
        Err(e) => Outcome {
            banner: Some((NoticeKind::Error, e.banner_text(REMOVE_FAILED_FALLBACK))),
            reset_form: false,
            refresh: false,
        },
    }
}

fn apply(outcome: Outcome, notifier: &Notifier, form: &NodeRef, refresh: &Callback<()>) {
    if let Some((kind, text)) = outcome.banner {
        notifier.show(text, kind);
    }
    if outcome.reset_form {
        if let Some(form) = form.cast::<HtmlFormElement>() {
            form.reset();
        }
    }
    if outcome.refresh {
        refresh.emit(());
    }
}

/// Binds one row's delete control to exactly its `(activity, email)`.
fn bind_remove(
    activity: &str,
    email: &str,
    on_remove: &Callback<(String, String)>,
) -> Callback<()> {
    let on_remove = on_remove.clone();
    let target = (activity.to_string(), email.to_string());
    Callback::from(move |_: ()| on_remove.emit(target.clone()))
}

#[function_component(App)]
fn app() -> Html {
    let config = use_memo((), |_| BoardConfig::load());
    let api = use_memo(config.api_base.clone(), |base| ActivitiesApi::new(base));

    let board = use_state(|| Board::Loading);
    // Only replaced by a successful load; a failed one leaves the old options.
    let options = use_state(Vec::<String>::new);
    let form_ref = use_node_ref();
    let email_ref = use_node_ref();
    let activity_ref = use_node_ref();
    let (notice, notifier) = use_notifier(config.notice_ms);

    let refresh = {
        let api = api.clone();
        let board = board.clone();
        let options = options.clone();
        Callback::from(move |_: ()| {
            let api = api.clone();
            let board = board.clone();
            let options = options.clone();
            spawn_local(async move {
                match api.fetch_activities().await {
                    Ok(set) => {
                        log!(format!("Loaded {} activities", set.len()));
                        options.set(set.names().map(str::to_string).collect());
                        board.set(Board::Loaded(set));
                    }
                    Err(e) => {
                        error!(format!("Error fetching activities: {e}"));
                        board.set(Board::Failed);
                    }
                }
            });
        })
    };

    // Initial load
    {
        let refresh = refresh.clone();
        use_effect_with((), move |_| {
            refresh.emit(());
            || ()
        });
    }

    let on_submit = {
        let api = api.clone();
        let form_ref = form_ref.clone();
        let email_ref = email_ref.clone();
        let activity_ref = activity_ref.clone();
        let notifier = notifier.clone();
        let refresh = refresh.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let address = email_ref
                .cast::<HtmlInputElement>()
                .map(|input| input.value())
                .unwrap_or_default();
            let activity = activity_ref
                .cast::<HtmlSelectElement>()
                .map(|sel| sel.value())
                .unwrap_or_default();

            let api = api.clone();
            let form_ref = form_ref.clone();
            let notifier = notifier.clone();
            let refresh = refresh.clone();
            spawn_local(async move {
                let result = api.sign_up(&activity, &address).await;
                if let Err(e) = &result {
                    error!(format!("Error signing up: {e}"));
                }
                apply(signup_outcome(result), &notifier, &form_ref, &refresh);
            });
        })
    };

    let on_remove = {
        let api = api.clone();
        let form_ref = form_ref.clone();
        let notifier = notifier.clone();
        let refresh = refresh.clone();
        Callback::from(move |(activity, address): (String, String)| {
            let api = api.clone();
            let form_ref = form_ref.clone();
            let notifier = notifier.clone();
            let refresh = refresh.clone();
            spawn_local(async move {
                let result = api.remove_participant(&activity, &address).await;
                if let Err(e) = &result {
                    error!(format!("Error removing participant: {e}"));
                }
                apply(removal_outcome(result), &notifier, &form_ref, &refresh);
            });
        })
    };

    let list = match &*board {
        Board::Loading => html! { <p>{ LOADING_TEXT }</p> },
        Board::Failed => html! { <p>{ LOAD_FAILED_TEXT }</p> },
        Board::Loaded(set) => set.iter().map(|a| activity_card(a, &on_remove)).collect(),
    };

    html! {
      <>
        <header>
          <h1>{ "Mergington High School" }</h1>
          <h2>{ "Extracurricular Activities" }</h2>
        </header>

        <main>
          <section id="activities-container">
            <h3>{ "Available Activities" }</h3>
            <div id="activities-list">{ list }</div>
          </section>

          <section id="signup-container">
            <h3>{ "Sign Up for an Activity" }</h3>
            <form id="signup-form" ref={form_ref} onsubmit={on_submit}>
              <div class="form-group">
                <label for="email">{ "Student Email:" }</label>
                <input
                  type="email"
                  id="email"
                  required=true
                  placeholder="your-email@mergington.edu"
                  ref={email_ref}
                />
              </div>
              <div class="form-group">
                <label for="activity">{ "Select Activity:" }</label>
                <select id="activity" required=true ref={activity_ref}>
                  <option value="">{ "-- Select an activity --" }</option>
                  { for options.iter().map(|name| html! {
                      <option value={name.clone()}>{ name.clone() }</option>
                  }) }
                </select>
              </div>
              <button type="submit">{ "Sign Up" }</button>
            </form>
            <div id="message" class={notice.class()}>{ notice.text.clone() }</div>
          </section>
        </main>

        <footer>
          <p>{ "© 2023 Mergington High School" }</p>
        </footer>
      </>
    }
}

fn activity_card(activity: &Activity, on_remove: &Callback<(String, String)>) -> Html {
    let rows = match roster(activity) {
        Roster::Placeholder => html! {
            <li class="no-participants">{ EMPTY_PARTICIPANTS_TEXT }</li>
        },
        Roster::Rows(emails) => emails
            .iter()
            .map(|email| participant_row(&activity.name, email, on_remove))
            .collect(),
    };

    html! {
      <div class="activity-card" key={activity.name.clone()}>
        <h4>{ activity.name.clone() }</h4>
        <p>{ activity.details.description.clone() }</p>
        <p><strong>{ "Schedule:" }</strong>{ format!(" {}", activity.details.schedule) }</p>
        <p><strong>{ "Availability:" }</strong>{ availability_text(activity) }</p>
        <div class="participants">
          <p><strong>{ "Participants:" }</strong></p>
          <ul class="participants-list">{ rows }</ul>
        </div>
      </div>
    }
}

fn participant_row(activity: &str, email: &str, on_remove: &Callback<(String, String)>) -> Html {
    let onclick = bind_remove(activity, email, on_remove).reform(|_: MouseEvent| ());

    html! {
      <li class="participant-item">
        <span class="participant-email">{ email.to_string() }</span>
        <button
          type="button"
          class="delete-participant"
          data-activity={activity.to_string()}
          data-email={email.to_string()}
          aria-label={remove_label(activity, email)}
          title="Remove participant"
          {onclick}
        >{ "×" }</button>
      </li>
    }
}

fn main() {
    yew::Renderer::<App>::new().render();
}
