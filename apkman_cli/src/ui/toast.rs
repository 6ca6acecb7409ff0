use std::time::{Duration, Instant};

/// How long a toast stays up before it starts leaving.
pub const TOAST_LIFETIME: Duration = Duration::from_millis(4500);
/// Exit animation window between "removing" and gone.
pub const TOAST_EXIT: Duration = Duration::from_millis(280);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: String,
    pub message: Option<String>,
    created_at: Instant,
    removing_since: Option<Instant>,
    shown: bool,
}

impl Toast {
    pub fn is_removing(&self) -> bool {
        self.removing_since.is_some()
    }
}

#[derive(Debug, Default)]
pub struct Toasts {
    next_id: u64,
    toasts: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, kind: ToastKind, title: &str, message: &str, now: Instant) -> u64 {
        self.next_id += 1;
        self.toasts.push(Toast {
            id: self.next_id,
            kind,
            title: title.to_string(),
            message: Some(message.to_string()).filter(|x| !x.is_empty()),
            created_at: now,
            removing_since: None,
            shown: false,
        });
        self.next_id
    }

    /// Starts the exit window of a toast. Dismissing twice changes nothing.
    pub fn dismiss(&mut self, id: u64, now: Instant) {
        if let Some(toast) = self.toasts.iter_mut().find(|x| x.id == id) {
            if toast.removing_since.is_none() {
                toast.removing_since = Some(now);
            }
        }
    }

    /// Expires old toasts and drops the ones whose exit window has passed.
    pub fn tick(&mut self, now: Instant) {
        for toast in self.toasts.iter_mut() {
            if toast.removing_since.is_none()
                && now.saturating_duration_since(toast.created_at) >= TOAST_LIFETIME
            {
                toast.removing_since = Some(toast.created_at + TOAST_LIFETIME);
            }
        }
        self.toasts.retain(|x| match x.removing_since {
            Some(since) => now.saturating_duration_since(since) < TOAST_EXIT,
            None => true,
        });
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    /// Toasts not yet handed out, marked as shown.
    pub fn take_unshown(&mut self) -> Vec<Toast> {
        self.toasts
            .iter_mut()
            .filter(|x| !x.shown)
            .map(|x| {
                x.shown = true;
                x.clone()
            })
            .collect()
    }

    pub fn dismiss_all(&mut self, now: Instant) {
        let ids = self.toasts.iter().map(|x| x.id).collect::<Vec<u64>>();
        for id in ids {
            self.dismiss(id, now);
        }
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
