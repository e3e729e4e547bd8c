//! Edge-triggered expression-to-event state machine.
//!
//! Each configured action is bound to one blendshape score and a threshold.
//! A latch arms once when the score rises above the threshold and disarms
//! when it falls back to or below it, so a held expression fires exactly
//! once. Only the first matching action per tick is reported, in the
//! definition order of [`EventType`].

use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Actions a facial expression can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CursorTouch,
    CursorPause,
    CursorReset,
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
    DragToggle,
    Home,
    Back,
    ShowNotification,
    SwipeStart,
    SwipeStop,
    ShowApps,
    ToggleTouch,
    ContinuousTouch,
    CursorLongTouch,
    BeginTouch,
    EndTouch,
    DeletePreviousWord,
    SmartTouch,
}

impl EventType {
    /// Number of actions
    pub const COUNT: usize = 21;

    /// Every action, in evaluation order
    pub const ALL: [Self; Self::COUNT] = [
        Self::CursorTouch,
        Self::CursorPause,
        Self::CursorReset,
        Self::SwipeLeft,
        Self::SwipeRight,
        Self::SwipeUp,
        Self::SwipeDown,
        Self::DragToggle,
        Self::Home,
        Self::Back,
        Self::ShowNotification,
        Self::SwipeStart,
        Self::SwipeStop,
        Self::ShowApps,
        Self::ToggleTouch,
        Self::ContinuousTouch,
        Self::CursorLongTouch,
        Self::BeginTouch,
        Self::EndTouch,
        Self::DeletePreviousWord,
        Self::SmartTouch,
    ];

    /// Position in [`EventType::ALL`]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Configuration key, e.g. `CURSOR_TOUCH`
    pub const fn key(self) -> &'static str {
        match self {
            Self::CursorTouch => "CURSOR_TOUCH",
            Self::CursorPause => "CURSOR_PAUSE",
            Self::CursorReset => "CURSOR_RESET",
            Self::SwipeLeft => "SWIPE_LEFT",
            Self::SwipeRight => "SWIPE_RIGHT",
            Self::SwipeUp => "SWIPE_UP",
            Self::SwipeDown => "SWIPE_DOWN",
            Self::DragToggle => "DRAG_TOGGLE",
            Self::Home => "HOME",
            Self::Back => "BACK",
            Self::ShowNotification => "SHOW_NOTIFICATION",
            Self::SwipeStart => "SWIPE_START",
            Self::SwipeStop => "SWIPE_STOP",
            Self::ShowApps => "SHOW_APPS",
            Self::ToggleTouch => "TOGGLE_TOUCH",
            Self::ContinuousTouch => "CONTINUOUS_TOUCH",
            Self::CursorLongTouch => "CURSOR_LONG_TOUCH",
            Self::BeginTouch => "BEGIN_TOUCH",
            Self::EndTouch => "END_TOUCH",
            Self::DeletePreviousWord => "DELETE_PREVIOUS_WORD",
            Self::SmartTouch => "SMART_TOUCH",
        }
    }

    /// Parse a configuration key, case-insensitively
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.key().eq_ignore_ascii_case(key.trim()))
    }

    /// Continuous-style actions whose release is reported
    pub const fn reports_release(self) -> bool {
        matches!(self, Self::ContinuousTouch | Self::SmartTouch)
    }

    /// Global navigation actions; starting one disarms every other latch
    pub const fn is_global_navigation(self) -> bool {
        matches!(
            self,
            Self::Home
                | Self::Back
                | Self::ShowNotification
                | Self::ShowApps
                | Self::CursorPause
                | Self::CursorReset
        )
    }
}

/// Expression scores an action can be bound to.
///
/// Tracker-backed blendshapes carry their index into the score vector.
/// Virtual bindings (switches, keyboard swipe) have negative indices and are
/// driven by other inputs, never by scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Blendshape {
    None,
    OpenMouth,
    MouthLeft,
    MouthRight,
    RollLowerMouth,
    RaiseLeftEyebrow,
    LowerLeftEyebrow,
    RaiseRightEyebrow,
    LowerRightEyebrow,
    SwitchOne,
    SwitchTwo,
    SwitchThree,
    SwipeFromRightKbd,
}

impl Blendshape {
    pub const ALL: [Self; 13] = [
        Self::None,
        Self::OpenMouth,
        Self::MouthLeft,
        Self::MouthRight,
        Self::RollLowerMouth,
        Self::RaiseLeftEyebrow,
        Self::LowerLeftEyebrow,
        Self::RaiseRightEyebrow,
        Self::LowerRightEyebrow,
        Self::SwitchOne,
        Self::SwitchTwo,
        Self::SwitchThree,
        Self::SwipeFromRightKbd,
    ];

    /// Index as reported by the tracker; negative for virtual bindings
    pub const fn raw_index(self) -> i32 {
        match self {
            Self::None => -1,
            Self::SwipeFromRightKbd => -2,
            Self::SwitchOne => -11,
            Self::SwitchTwo => -22,
            Self::SwitchThree => -33,
            Self::OpenMouth => 25,
            Self::MouthLeft => 39,
            Self::MouthRight => 33,
            Self::RollLowerMouth => 40,
            Self::RaiseLeftEyebrow => 5,
            Self::LowerLeftEyebrow => 2,
            Self::RaiseRightEyebrow => 4,
            Self::LowerRightEyebrow => 1,
        }
    }

    /// Index into the score vector, `None` for virtual bindings
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.raw_index()).ok()
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::OpenMouth => "OPEN_MOUTH",
            Self::MouthLeft => "MOUTH_LEFT",
            Self::MouthRight => "MOUTH_RIGHT",
            Self::RollLowerMouth => "ROLL_LOWER_MOUTH",
            Self::RaiseLeftEyebrow => "RAISE_LEFT_EYEBROW",
            Self::LowerLeftEyebrow => "LOWER_LEFT_EYEBROW",
            Self::RaiseRightEyebrow => "RAISE_RIGHT_EYEBROW",
            Self::LowerRightEyebrow => "LOWER_RIGHT_EYEBROW",
            Self::SwitchOne => "SWITCH_ONE",
            Self::SwitchTwo => "SWITCH_TWO",
            Self::SwitchThree => "SWITCH_THREE",
            Self::SwipeFromRightKbd => "SWIPE_FROM_RIGHT_KBD",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.key().eq_ignore_ascii_case(key.trim()))
    }
}

/// Human-readable names for actions and blendshapes
#[derive(Debug, Clone)]
pub struct Labels {
    events: [&'static str; EventType::COUNT],
    blendshapes: [&'static str; 13],
}

impl Labels {
    pub fn new() -> Self {
        let mut events = [""; EventType::COUNT];
        for event in EventType::ALL {
            events[event.ordinal()] = match event {
                EventType::CursorTouch => "Select",
                EventType::CursorPause => "Pause / Unpause",
                EventType::CursorReset => "Reset",
                EventType::SwipeLeft => "Swipe left",
                EventType::SwipeRight => "Swipe right",
                EventType::SwipeUp => "Swipe up",
                EventType::SwipeDown => "Swipe down",
                EventType::DragToggle => "Drag toggle",
                EventType::Home => "Home",
                EventType::Back => "Back",
                EventType::ShowNotification => "Notification",
                EventType::SwipeStart => "Swipe start",
                EventType::SwipeStop => "Swipe stop",
                EventType::ShowApps => "All apps",
                EventType::ToggleTouch => "Toggle touch",
                EventType::ContinuousTouch => "Continuous touch",
                EventType::CursorLongTouch => "Long touch",
                EventType::BeginTouch => "Begin touch",
                EventType::EndTouch => "End touch",
                EventType::DeletePreviousWord => "Delete previous word",
                EventType::SmartTouch => "Combined tap",
            };
        }

        let mut blendshapes = [""; 13];
        for (slot, shape) in blendshapes.iter_mut().zip(Blendshape::ALL) {
            *slot = match shape {
                Blendshape::None => "No binding",
                Blendshape::OpenMouth => "Open mouth",
                Blendshape::MouthLeft => "Mouth left",
                Blendshape::MouthRight => "Mouth right",
                Blendshape::RollLowerMouth => "Roll lower mouth",
                Blendshape::RaiseLeftEyebrow => "Raise left eyebrow",
                Blendshape::LowerLeftEyebrow => "Lower left eyebrow",
                Blendshape::RaiseRightEyebrow => "Raise right eyebrow",
                Blendshape::LowerRightEyebrow => "Lower right eyebrow",
                Blendshape::SwitchOne => "Switch one",
                Blendshape::SwitchTwo => "Switch two",
                Blendshape::SwitchThree => "Switch three",
                Blendshape::SwipeFromRightKbd => "Swipe from right side of keyboard",
            };
        }

        Self { events, blendshapes }
    }

    pub fn event(&self, event: EventType) -> &'static str {
        self.events[event.ordinal()]
    }

    pub fn blendshape(&self, shape: Blendshape) -> &'static str {
        Blendshape::ALL
            .iter()
            .position(|&b| b == shape)
            .map_or("", |i| self.blendshapes[i])
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::new()
    }
}

/// A blendshape and the score it must exceed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerBinding {
    pub blendshape: Blendshape,
    pub threshold: f32,
}

impl TriggerBinding {
    /// Threshold is clamped into `[0, 1]`; a non-finite threshold disables
    /// the binding.
    pub fn new(blendshape: Blendshape, threshold: f32) -> Option<Self> {
        if !threshold.is_finite() {
            warn!("Ignoring non-finite threshold for {}", blendshape.key());
            return None;
        }
        let clamped = threshold.clamp(0.0, 1.0);
        if (clamped - threshold).abs() > f32::EPSILON {
            warn!(
                "Threshold {} for {} out of range, clamped to {}",
                threshold,
                blendshape.key(),
                clamped
            );
        }
        Some(Self { blendshape, threshold: clamped })
    }
}

/// Result of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventDetails {
    pub event: EventType,
    pub blendshape: Blendshape,
    /// `true` on the upward crossing, `false` on a reported release
    pub is_starting_event: bool,
}

/// Latch table indexed by [`EventType`]
#[derive(Debug, Clone)]
pub struct EventTriggerLatch {
    bindings: [Option<TriggerBinding>; EventType::COUNT],
    armed: [bool; EventType::COUNT],
}

impl EventTriggerLatch {
    /// Empty table; nothing fires until bound
    pub fn new() -> Self {
        Self {
            bindings: [None; EventType::COUNT],
            armed: [false; EventType::COUNT],
        }
    }

    pub fn with_bindings<I>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (EventType, TriggerBinding)>,
    {
        let mut latch = Self::new();
        for (event, binding) in bindings {
            latch.bind(event, binding);
        }
        latch
    }

    /// Replace the binding for an action and disarm it
    pub fn bind(&mut self, event: EventType, binding: TriggerBinding) {
        self.bindings[event.ordinal()] = Some(binding);
        self.armed[event.ordinal()] = false;
    }

    pub fn unbind(&mut self, event: EventType) {
        self.bindings[event.ordinal()] = None;
        self.armed[event.ordinal()] = false;
    }

    pub fn binding(&self, event: EventType) -> Option<TriggerBinding> {
        self.bindings[event.ordinal()]
    }

    pub fn is_armed(&self, event: EventType) -> bool {
        self.armed[event.ordinal()]
    }

    /// Whether a discrete event is currently held
    pub fn any_active(&self) -> bool {
        self.armed.iter().any(|&a| a)
    }

    /// Disarm every latch without reporting releases
    pub fn reset_all(&mut self) {
        self.armed = [false; EventType::COUNT];
    }

    /// Evaluate one tick of scores.
    ///
    /// Returns the first action that armed this tick, or the first
    /// whitelisted action that released. Scores missing from the vector
    /// count as no trigger.
    pub fn evaluate(&mut self, scores: &[f32]) -> Option<EventDetails> {
        for event in EventType::ALL {
            let i = event.ordinal();
            let Some(binding) = self.bindings[i] else {
                continue;
            };
            let Some(score) = binding.blendshape.index().and_then(|idx| scores.get(idx).copied()) else {
                continue;
            };
            if !score.is_finite() {
                continue;
            }

            if !self.armed[i] && score > binding.threshold {
                self.armed[i] = true;
                if event.is_global_navigation() {
                    self.disarm_others(event);
                }
                debug!("{} armed ({} = {:.2})", event.key(), binding.blendshape.key(), score);
                return Some(EventDetails {
                    event,
                    blendshape: binding.blendshape,
                    is_starting_event: true,
                });
            }

            if self.armed[i] && score <= binding.threshold {
                self.armed[i] = false;
                if event.reports_release() {
                    debug!("{} released", event.key());
                    return Some(EventDetails {
                        event,
                        blendshape: binding.blendshape,
                        is_starting_event: false,
                    });
                }
            }
        }
        None
    }

    fn disarm_others(&mut self, keep: EventType) {
        for (i, armed) in self.armed.iter_mut().enumerate() {
            if i != keep.ordinal() {
                *armed = false;
            }
        }
    }
}

impl Default for EventTriggerLatch {
    fn default() -> Self {
        Self::new()
    }
}
