//! Conversation engine — one dispatch routine over (step, event kind).
//!
//! The engine owns no state of its own: it is handed the draft loaded for the
//! conversation, applies exactly one inbound event to it, and hands back the
//! reply. Persistence stays with the caller. Every collaborator failure is
//! converted into a user-facing reply at the point of occurrence and leaves
//! the draft at its prior step, so the same input can simply be resubmitted.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::address::PostalLookup;
use crate::classify::{Classifier, MANUAL_TOPK};
use crate::config::ClassifyPolicy;
use crate::draft::{Draft, Schedule, Step};
use crate::error::{ClassifyError, LookupError};
use crate::schedule::{ScheduleCatalog, day_label};
use crate::validators;

/// One inbound conversation event, already decoded by the transport adapter.
#[derive(Debug, Clone)]
pub enum Event {
    /// Free text.
    Text(String),
    /// An opaque reference to an uploaded image.
    Media(String),
    /// An opaque selection code from a previously offered option row
    /// (`kind:payload`).
    Selection(String),
}

/// One selectable option row offered with a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRow {
    pub label: String,
    pub code: String,
}

impl OptionRow {
    fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }
}

/// Outbound reply: text (with lightweight `*bold*` emphasis) plus optional
/// option rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionRow>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
        }
    }

    fn with_options(mut self, options: Vec<OptionRow>) -> Self {
        self.options = options;
        self
    }
}

/// Composes validators, classifier, lookup, and catalog into the wizard's
/// single transition routine.
pub struct ConversationEngine {
    classifier: Arc<dyn Classifier>,
    lookup: Arc<dyn PostalLookup>,
    catalog: ScheduleCatalog,
    policy: ClassifyPolicy,
    max_qty: u32,
}

impl ConversationEngine {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        lookup: Arc<dyn PostalLookup>,
        catalog: ScheduleCatalog,
        policy: ClassifyPolicy,
        max_qty: u32,
    ) -> Self {
        Self {
            classifier,
            lookup,
            catalog,
            policy,
            max_qty,
        }
    }

    /// Apply one inbound event to the draft. Infallible from the caller's
    /// point of view: failures become user-facing replies.
    pub async fn handle(&self, draft: &mut Draft, event: Event) -> Reply {
        // Cancellation wins over everything, from any state.
        if let Event::Selection(code) = &event {
            if code == "cancel" {
                draft.reset();
                return Reply::text(format!(
                    "Request cancelled. {}",
                    self.prompt(draft).text
                ));
            }
        }

        // Media arriving before the profile is complete is stashed; the
        // classification runs automatically once the phone number validates.
        if let Event::Media(reference) = &event {
            if draft.step.in_profile() {
                draft.pending_media = Some(reference.clone());
                let ask = self.prompt(draft).text;
                return Reply::text(format!(
                    "Got the photo — I'll take a look right after we finish your details.\n\n{ask}"
                ));
            }
        }

        match (draft.step, event) {
            (Step::Name, Event::Text(text)) => self.on_name(draft, &text),
            (Step::NationalId, Event::Text(text)) => self.on_national_id(draft, &text),
            (Step::Phone, Event::Text(text)) => self.on_phone(draft, &text).await,
            (Step::AwaitPhoto, Event::Media(reference)) => {
                self.classify_and_offer(draft, &reference).await
            }
            (Step::AwaitConfirm, Event::Selection(code)) => self.on_confirm(draft, &code),
            (Step::AwaitQty, Event::Text(text)) => self.on_qty(draft, &text),
            (Step::AwaitQty, Event::Selection(code)) => {
                let payload = selection_payload(&code, "qty").unwrap_or(&code);
                self.on_qty(draft, payload)
            }
            (Step::AwaitCep, Event::Text(text)) => self.on_postal_code(draft, &text).await,
            (Step::AwaitNumber, Event::Text(text)) => self.on_number(draft, &text),
            (Step::AwaitDay, Event::Selection(code)) => self.on_day(draft, &code),
            (Step::AwaitTime, Event::Selection(code)) => self.on_time(draft, &code),
            // Wrong event kind for the current step: no forward progress.
            (step, _) => {
                tracing::debug!(%step, "event kind does not match step; reprompting");
                self.reprompt(draft)
            }
        }
    }

    // ── Step handlers ───────────────────────────────────────────────

    fn on_name(&self, draft: &mut Draft, text: &str) -> Reply {
        let name = text.trim();
        if name.is_empty() {
            return Reply::text("I didn't catch that. What's your *full name*?");
        }
        draft.user.name = Some(name.to_string());
        draft.step = Step::NationalId;
        Reply::text(format!(
            "Thanks, {name}! Now I need your *national ID number* (11 digits)."
        ))
    }

    fn on_national_id(&self, draft: &mut Draft, text: &str) -> Reply {
        if !validators::is_valid_national_id(text) {
            return Reply::text(
                "That ID number doesn't check out. Please send the 11 digits again.",
            );
        }
        draft.user.national_id = Some(validators::digits(text));
        draft.step = Step::Phone;
        Reply::text("Got it. What's your *phone number* with area code?")
    }

    async fn on_phone(&self, draft: &mut Draft, text: &str) -> Reply {
        if !validators::is_valid_phone(text) {
            return Reply::text(
                "A phone number has 10 or 11 digits including the area code. Try again?",
            );
        }
        draft.user.phone = Some(validators::digits(text));
        draft.step = Step::AwaitPhoto;

        // A photo sent earlier was waiting on the profile; classify it now.
        if let Some(reference) = draft.pending_media.take() {
            return self.classify_and_offer(draft, &reference).await;
        }
        self.prompt(draft)
    }

    /// Classify an uploaded photo and offer the result per the configured
    /// policy. On failure the draft stays at `AwaitPhoto` for a resend.
    async fn classify_and_offer(&self, draft: &mut Draft, reference: &str) -> Reply {
        let topk = match self.policy {
            ClassifyPolicy::AutoAccept => 1,
            ClassifyPolicy::Manual => MANUAL_TOPK,
        };

        let candidates = match self.classifier.classify(reference, topk).await {
            Ok(candidates) => candidates,
            Err(ClassifyError::Timeout) => {
                return Reply::text(
                    "The photo analysis timed out. Compressed previews often cause this — \
                     please resend the picture as an *uncompressed original* (file/document).",
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, reference, "classification failed");
                return Reply::text(
                    "I couldn't analyze the photo right now. Please send it again in a moment.",
                );
            }
        };

        let Some(first) = candidates.first() else {
            tracing::warn!(reference, "classifier returned an empty ranking");
            return Reply::text(
                "I couldn't analyze the photo right now. Please send it again in a moment.",
            );
        };

        draft.step = Step::AwaitConfirm;
        match self.policy {
            ClassifyPolicy::AutoAccept => {
                let top = first.clone();
                let text = format!(
                    "This looks like *{}* ({}% sure). Is that right?",
                    top.label,
                    top.percent()
                );
                draft.item = Some(top);
                Reply::text(text).with_options(confirm_options())
            }
            ClassifyPolicy::Manual => {
                let options = candidate_options(&candidates);
                draft.candidates = Some(candidates);
                Reply::text("Which of these matches your item?").with_options(options)
            }
        }
    }

    fn on_confirm(&self, draft: &mut Draft, code: &str) -> Reply {
        // A confirm step with nothing to confirm means the classification
        // result was lost; ask for the photo again rather than looping.
        if draft.item.is_none() && draft.candidates.is_none() {
            draft.step = Step::AwaitPhoto;
            return Reply::text(
                "I lost track of that photo — please send the picture of the item again.",
            );
        }

        match self.policy {
            ClassifyPolicy::AutoAccept => match code {
                "confirm:yes" => {
                    draft.step = Step::AwaitQty;
                    self.prompt(draft)
                }
                "confirm:no" => {
                    draft.item = None;
                    draft.step = Step::AwaitPhoto;
                    Reply::text(
                        "No problem. Send another photo of the item and I'll try again.",
                    )
                }
                _ => self.reprompt(draft),
            },
            ClassifyPolicy::Manual => match selection_payload(code, "item") {
                Some("none") => {
                    draft.candidates = None;
                    draft.step = Step::AwaitPhoto;
                    Reply::text(
                        "No problem. Send another photo of the item and I'll try again.",
                    )
                }
                Some(index) => {
                    let picked = index
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| draft.candidates.as_ref()?.get(i).cloned());
                    match picked {
                        Some(candidate) => {
                            draft.item = Some(candidate);
                            draft.candidates = None;
                            draft.step = Step::AwaitQty;
                            self.prompt(draft)
                        }
                        None => self.reprompt(draft),
                    }
                }
                None => self.reprompt(draft),
            },
        }
    }

    fn on_qty(&self, draft: &mut Draft, raw: &str) -> Reply {
        let Some(qty) = validators::parse_qty(raw, self.max_qty) else {
            return Reply::text(format!(
                "Please send the quantity as a number between 1 and {}.",
                self.max_qty
            ));
        };
        draft.qty = Some(qty);
        draft.step = Step::AwaitCep;
        self.prompt(draft)
    }

    async fn on_postal_code(&self, draft: &mut Draft, text: &str) -> Reply {
        let Some(code) = validators::normalize_postal_code(text) else {
            return Reply::text("A postal code has exactly 8 digits. Try again?");
        };

        match self.lookup.lookup(&code).await {
            Ok(address) => {
                let found = address.display_line();
                draft.address = Some(address);
                draft.step = Step::AwaitNumber;
                Reply::text(format!(
                    "Found it: {found}\n\nWhat's the *street number* (and complement, if any)?"
                ))
            }
            Err(LookupError::NotFound) => Reply::text(
                "I couldn't find that postal code. Double-check the digits and send it again.",
            ),
            Err(LookupError::Timeout) => Reply::text(
                "The address lookup is taking too long. Please send the postal code again in a moment.",
            ),
            Err(e) => {
                tracing::warn!(error = %e, code, "postal lookup failed");
                Reply::text(
                    "I couldn't look that up right now. Please send the postal code again in a moment.",
                )
            }
        }
    }

    fn on_number(&self, draft: &mut Draft, text: &str) -> Reply {
        let Some((number, complement)) = validators::parse_number_line(text) else {
            return Reply::text(
                "Please start with the street number, e.g. *100* or *100 apt 42*.",
            );
        };
        let Some(address) = draft.address.as_mut() else {
            // Lookup result went missing; redo the postal code step.
            draft.step = Step::AwaitCep;
            return Reply::text(
                "I lost your address lookup — what's your *postal code* (8 digits)?",
            );
        };
        address.number = Some(number);
        address.complement = complement;
        let saved = address.display_line();

        draft.step = Step::AwaitDay;
        Reply::text(format!("Address saved: {saved}\n\nPick a *day* for the pickup:"))
            .with_options(self.day_options())
    }

    fn on_day(&self, draft: &mut Draft, code: &str) -> Reply {
        let chosen = selection_payload(code, "day")
            .and_then(|payload| NaiveDate::parse_from_str(payload, "%Y-%m-%d").ok())
            .filter(|date| self.catalog.is_valid_day(*date));

        let Some(day) = chosen else {
            return Reply::text("That day isn't available. Pick one of these:")
                .with_options(self.day_options());
        };
        draft.schedule = Some(Schedule { day, time: None });
        draft.step = Step::AwaitTime;
        self.prompt(draft)
    }

    fn on_time(&self, draft: &mut Draft, code: &str) -> Reply {
        let chosen = selection_payload(code, "time")
            .filter(|payload| self.catalog.is_valid_slot(payload));

        let Some(slot) = chosen else {
            return Reply::text("That time isn't available. Pick one of these:")
                .with_options(self.time_options());
        };
        let Some(schedule) = draft.schedule.as_mut() else {
            return self.lost_state(draft);
        };
        schedule.time = Some(slot.to_string());

        match summary(draft) {
            Some(text) => {
                draft.reset();
                Reply::text(text)
            }
            None => self.lost_state(draft),
        }
    }

    /// A terminal step was reached with prerequisite fields missing — the
    /// hosting process was likely recycled mid-conversation. Recover with an
    /// explicit restart instead of crashing.
    fn lost_state(&self, draft: &mut Draft) -> Reply {
        tracing::warn!(step = %draft.step, "draft incomplete at terminal step; resetting");
        draft.reset();
        Reply::text(
            "Sorry — I lost part of your request (the service may have restarted). \
             Let's start over: what's your *full name*?",
        )
    }

    // ── Prompts and option rows ─────────────────────────────────────

    /// The question for the draft's current step.
    fn prompt(&self, draft: &Draft) -> Reply {
        match draft.step {
            Step::Name => Reply::text(
                "Hi! I can schedule an electronic-waste pickup for you. \
                 What's your *full name*?",
            ),
            Step::NationalId => {
                Reply::text("What's your *national ID number* (11 digits)?")
            }
            Step::Phone => Reply::text("What's your *phone number* with area code?"),
            Step::AwaitPhoto => {
                Reply::text("Now send me a *photo* of the item you want picked up.")
            }
            Step::AwaitConfirm => match (&draft.item, &draft.candidates) {
                (Some(item), _) => Reply::text(format!(
                    "This looks like *{}* ({}% sure). Is that right?",
                    item.label,
                    item.percent()
                ))
                .with_options(confirm_options()),
                (None, Some(candidates)) => {
                    Reply::text("Which of these matches your item?")
                        .with_options(candidate_options(candidates))
                }
                (None, None) => {
                    Reply::text("Send me a *photo* of the item you want picked up.")
                }
            },
            Step::AwaitQty => Reply::text(format!(
                "How many items should we pick up? (1–{})",
                self.max_qty
            ))
            .with_options(qty_options()),
            Step::AwaitCep => Reply::text("What's your *postal code* (8 digits)?"),
            Step::AwaitNumber => {
                Reply::text("What's the *street number* (and complement, if any)?")
            }
            Step::AwaitDay => Reply::text("Pick a *day* for the pickup:")
                .with_options(self.day_options()),
            Step::AwaitTime => Reply::text("Pick a *time slot*:")
                .with_options(self.time_options()),
        }
    }

    fn reprompt(&self, draft: &Draft) -> Reply {
        let mut reply = self.prompt(draft);
        reply.text = format!("Sorry, I didn't get that. {}", reply.text);
        reply
    }

    fn day_options(&self) -> Vec<OptionRow> {
        self.catalog
            .days()
            .into_iter()
            .map(|day| OptionRow::new(day.label, format!("day:{}", day.date)))
            .collect()
    }

    fn time_options(&self) -> Vec<OptionRow> {
        self.catalog
            .slots()
            .iter()
            .map(|slot| OptionRow::new(slot.clone(), format!("time:{slot}")))
            .collect()
    }
}

/// Payload of a `kind:payload` selection code, if the kind matches.
fn selection_payload<'a>(code: &'a str, kind: &str) -> Option<&'a str> {
    let (head, payload) = code.split_once(':')?;
    (head == kind).then_some(payload)
}

fn confirm_options() -> Vec<OptionRow> {
    vec![
        OptionRow::new("Yes, that's it", "confirm:yes"),
        OptionRow::new("No, something else", "confirm:no"),
    ]
}

fn candidate_options(candidates: &[crate::classify::Candidate]) -> Vec<OptionRow> {
    let mut options: Vec<OptionRow> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            OptionRow::new(format!("{} ({}%)", c.label, c.percent()), format!("item:{i}"))
        })
        .collect();
    options.push(OptionRow::new("None of these", "item:none"));
    options
}

fn qty_options() -> Vec<OptionRow> {
    (1..=3)
        .map(|n| OptionRow::new(n.to_string(), format!("qty:{n}")))
        .collect()
}

/// Confirmation summary across all collected groups, or `None` if any
/// prerequisite is missing.
fn summary(draft: &Draft) -> Option<String> {
    let name = draft.user.name.as_deref()?;
    let national_id = draft.user.national_id.as_deref()?;
    let phone = draft.user.phone.as_deref()?;
    let item = draft.item.as_ref()?;
    let qty = draft.qty?;
    let address = draft.address.as_ref()?;
    let schedule = draft.schedule.as_ref()?;
    let time = schedule.time.as_deref()?;

    Some(format!(
        "*Pickup confirmed!*\n\n\
         • Name: {name}\n\
         • ID: {national_id}\n\
         • Phone: {phone}\n\
         • Item: {} ({}%)\n\
         • Quantity: {qty}\n\
         • Address: {}\n\
         • When: {} at {time}\n\n\
         Send anything to start a new request.",
        item.label,
        item.percent(),
        address.display_line(),
        day_label(schedule.day),
    ))
}
