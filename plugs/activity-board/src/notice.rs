use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use yew::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticeKind {
    #[default]
    Success,
    Error,
}

impl NoticeKind {
    pub fn class(self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
        }
    }
}

/// The banner under the sign-up form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    pub visible: bool,
    /// Identifies the message currently shown. A hide for any other ticket
    /// is stale.
    pub ticket: u64,
}

impl Notice {
    pub fn class(&self) -> String {
        if self.visible {
            self.kind.class().to_string()
        } else {
            format!("{} hidden", self.kind.class())
        }
    }
}

pub enum NoticeAction {
    Show {
        text: String,
        kind: NoticeKind,
        ticket: u64,
    },
    Hide {
        ticket: u64,
    },
}

impl Reducible for Notice {
    type Action = NoticeAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        match action {
            NoticeAction::Show { text, kind, ticket } => Rc::new(Notice {
                text,
                kind,
                visible: true,
                ticket,
            }),
            NoticeAction::Hide { ticket } if ticket == self.ticket && self.visible => {
                Rc::new(Notice {
                    visible: false,
                    ..(*self).clone()
                })
            }
            NoticeAction::Hide { .. } => self,
        }
    }
}

/// At most one pending hide timer, plus the ticket it was armed for.
///
/// Generic over the handle so the clear-then-rearm order holds for any
/// handle that cancels on drop, `Timeout` included.
#[derive(Debug)]
pub struct HideSlot<H> {
    pending: Option<H>,
    last_ticket: u64,
}

impl<H> Default for HideSlot<H> {
    fn default() -> Self {
        Self {
            pending: None,
            last_ticket: 0,
        }
    }
}

impl<H> HideSlot<H> {
    /// Drops the pending handle, then stores the one `arm` builds for the
    /// next ticket. Returns that ticket.
    pub fn rearm(&mut self, arm: impl FnOnce(u64) -> H) -> u64 {
        drop(self.pending.take());
        self.last_ticket += 1;
        let ticket = self.last_ticket;
        self.pending = Some(arm(ticket));
        ticket
    }
}

/// Shows banners and owns the one pending auto-hide timer.
#[derive(Clone)]
pub struct Notifier {
    dispatch: UseReducerDispatcher<Notice>,
    slot: Rc<RefCell<HideSlot<Timeout>>>,
    hide_after_ms: u32,
}

impl Notifier {
    pub fn show(&self, text: impl Into<String>, kind: NoticeKind) {
        let hide_after_ms = self.hide_after_ms;
        let ticket = self.slot.borrow_mut().rearm(|ticket| {
            let dispatch = self.dispatch.clone();
            Timeout::new(hide_after_ms, move || {
                dispatch.dispatch(NoticeAction::Hide { ticket });
            })
        });
        self.dispatch.dispatch(NoticeAction::Show {
            text: text.into(),
            kind,
            ticket,
        });
    }
}

#[hook]
pub fn use_notifier(hide_after_ms: u32) -> (UseReducerHandle<Notice>, Notifier) {
    let notice = use_reducer(Notice::default);
    let slot = use_mut_ref(HideSlot::<Timeout>::default);

    let notifier = Notifier {
        dispatch: notice.dispatcher(),
        slot,
        hide_after_ms,
    };
    (notice, notifier)
}
