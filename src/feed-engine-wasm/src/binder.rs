use ahash::AHashSet;
use smallvec::SmallVec;

/// Host buttons we attach behaviour to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostRole {
    Search,
    Filter,
    Queue,
}

impl HostRole {
    pub const ALL: [HostRole; 3] = [HostRole::Search, HostRole::Filter, HostRole::Queue];

    pub fn parse(value: &str) -> Option<Self> {
        HostRole::ALL.into_iter().find(|role| role.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostRole::Search => "search",
            HostRole::Filter => "filter",
            HostRole::Queue => "queue",
        }
    }
}

/// Controls injected next to the host UI that re-renders may wipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectedControl {
    MuteButton,
    PlayerSize,
    TextLayout,
}

impl InjectedControl {
    pub const ALL: [InjectedControl; 3] = [
        InjectedControl::MuteButton,
        InjectedControl::PlayerSize,
        InjectedControl::TextLayout,
    ];

    pub fn element_id(&self) -> &'static str {
        match self {
            InjectedControl::MuteButton => "movieshows-mute-toggle",
            InjectedControl::PlayerSize => "movieshows-player-size",
            InjectedControl::TextLayout => "movieshows-text-layout",
        }
    }
}

/// Narrow view of a UI we do not own
pub trait HostAdapter {
    type Handle;

    fn find_button_by_role(&self, role: HostRole) -> Option<Self::Handle>;

    /// Whether our handler is already attached to this element
    fn is_bound(&self, handle: &Self::Handle) -> bool;

    fn mark_bound(&self, handle: &Self::Handle, role: HostRole);

    fn has_element(&self, id: &str) -> bool;
}

/// Trim, lowercase and collapse inner whitespace
pub fn normalize_label(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Role suggested by a button's visible text or aria label
pub fn role_for_label(label: &str) -> Option<HostRole> {
    let label = normalize_label(label);
    if label.is_empty() {
        None
    } else if label.contains("search") {
        Some(HostRole::Search)
    } else if label.contains("filter") {
        Some(HostRole::Filter)
    } else if label.contains("queue") || label.contains("my list") {
        Some(HostRole::Queue)
    } else {
        None
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BindReport {
    pub bound: SmallVec<[HostRole; 3]>,
    pub missing: SmallVec<[HostRole; 3]>,
}

/// Re-runnable binding pass over the host UI
///
/// Safe to call on every mutation: elements that already carry our handler
/// are skipped, and a missing target is logged once until it shows up again.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    reported_missing: AHashSet<HostRole>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_pass<A, F>(&mut self, adapter: &A, mut attach: F) -> BindReport
    where
        A: HostAdapter,
        F: FnMut(HostRole, &A::Handle),
    {
        let mut report = BindReport::default();

        for role in HostRole::ALL {
            match adapter.find_button_by_role(role) {
                Some(handle) => {
                    self.reported_missing.remove(&role);
                    if adapter.is_bound(&handle) {
                        continue;
                    }
                    attach(role, &handle);
                    adapter.mark_bound(&handle, role);
                    report.bound.push(role);
                }
                None => {
                    if self.reported_missing.insert(role) {
                        log::info!("Host {} button not found, feature inactive", role.as_str());
                    }
                    report.missing.push(role);
                }
            }
        }

        report
    }

    /// Injected controls the host has wiped since the last pass
    pub fn missing_controls<A: HostAdapter>(&self, adapter: &A) -> SmallVec<[InjectedControl; 3]> {
        InjectedControl::ALL
            .into_iter()
            .filter(|control| !adapter.has_element(control.element_id()))
            .collect()
    }
}
