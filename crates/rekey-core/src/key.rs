// Rekey Key Table
// Key identifiers, event states and the surface-name table

use std::fmt;
use std::str::FromStr;

/// A single key identifier.
///
/// Newtype wrapper around `u16`. Values 1..=248 match Linux
/// input-event-codes.h; a contiguous extension range above them names the
/// logical aggregates (`Any`, `Shift`, `Ctrl`, `Meta`, `Virtual1..8`).
/// Codes from [`Key::FIRST_LOGICAL`] upward are allocated for user-defined
/// logical keys during a parse, codes from [`Key::FIRST_ACTION`] upward
/// reference terminal actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub const NONE: Key = Key(0);

    pub const CONTROL_LEFT: Key = Key(29);
    pub const SHIFT_LEFT: Key = Key(42);
    pub const SHIFT_RIGHT: Key = Key(54);
    pub const CONTROL_RIGHT: Key = Key(97);
    pub const META_LEFT: Key = Key(125);
    pub const META_RIGHT: Key = Key(126);

    pub const ANY: Key = Key(249);
    pub const SHIFT: Key = Key(250);
    pub const CTRL: Key = Key(251);
    pub const META: Key = Key(252);
    pub const VIRTUAL1: Key = Key(253);
    pub const VIRTUAL8: Key = Key(260);
    pub const COUNT: Key = Key(261);

    /// First code handed out to user-defined logical keys.
    pub const FIRST_LOGICAL: Key = Key(0x0200);
    /// First code referencing a terminal action (`Action0`).
    pub const FIRST_ACTION: Key = Key(0x0300);

    /// Raw numeric code value.
    pub fn code(self) -> u16 {
        self.0
    }

    /// Canonical surface name of this key.
    pub fn name(self) -> &'static str {
        name_by_key(self)
    }

    /// Key referencing the terminal action with the given index.
    pub fn action(index: usize) -> Key {
        Key(Self::FIRST_ACTION.0 + index as u16)
    }

    /// Index of the terminal action this key references, if any.
    pub fn action_index(self) -> Option<usize> {
        if self.0 >= Self::FIRST_ACTION.0 {
            Some((self.0 - Self::FIRST_ACTION.0) as usize)
        } else {
            None
        }
    }

    /// True for codes allocated to user-defined logical keys.
    pub fn is_user_logical(self) -> bool {
        self.0 >= Self::FIRST_LOGICAL.0 && self.0 < Self::FIRST_ACTION.0
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        key_by_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}

/// Transition state of a key at one position of a sequence.
///
/// `DownAsync`/`UpAsync` are non-committal markers: the transition may happen
/// any time from this position on, and a later `Down`/`Up` synchronizes.
/// `DownMatched` is written by the runtime matcher only; the parser never
/// produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Up,
    Down,
    Not,
    UpAsync,
    DownAsync,
    DownMatched,
}

/// One atom of the canonical low-level form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub state: KeyState,
}

impl KeyEvent {
    pub fn new(key: Key, state: KeyState) -> Self {
        Self { key, state }
    }
}

/// Ordered list of key events, the canonical form of a parsed expression.
pub type KeySequence = Vec<KeyEvent>;

// Surface names, in code order. Letters and digits use the plain character,
// everything else the initial-capital convention (ArrowLeft, IntlBackslash).
// Lookup is case-sensitive.
static KEY_NAMES: &[(&str, u16)] = &[
    ("Escape", 1),
    ("1", 2),
    ("2", 3),
    ("3", 4),
    ("4", 5),
    ("5", 6),
    ("6", 7),
    ("7", 8),
    ("8", 9),
    ("9", 10),
    ("0", 11),
    ("Minus", 12),
    ("Equal", 13),
    ("Backspace", 14),
    ("Tab", 15),
    ("Q", 16),
    ("W", 17),
    ("E", 18),
    ("R", 19),
    ("T", 20),
    ("Y", 21),
    ("U", 22),
    ("I", 23),
    ("O", 24),
    ("P", 25),
    ("BracketLeft", 26),
    ("BracketRight", 27),
    ("Enter", 28),
    ("ControlLeft", 29),
    ("A", 30),
    ("S", 31),
    ("D", 32),
    ("F", 33),
    ("G", 34),
    ("H", 35),
    ("J", 36),
    ("K", 37),
    ("L", 38),
    ("Semicolon", 39),
    ("Quote", 40),
    ("Backquote", 41),
    ("ShiftLeft", 42),
    ("Backslash", 43),
    ("Z", 44),
    ("X", 45),
    ("C", 46),
    ("V", 47),
    ("B", 48),
    ("N", 49),
    ("M", 50),
    ("Comma", 51),
    ("Period", 52),
    ("Slash", 53),
    ("ShiftRight", 54),
    ("NumpadMultiply", 55),
    ("AltLeft", 56),
    ("Space", 57),
    ("CapsLock", 58),
    ("F1", 59),
    ("F2", 60),
    ("F3", 61),
    ("F4", 62),
    ("F5", 63),
    ("F6", 64),
    ("F7", 65),
    ("F8", 66),
    ("F9", 67),
    ("F10", 68),
    ("NumLock", 69),
    ("ScrollLock", 70),
    ("Numpad7", 71),
    ("Numpad8", 72),
    ("Numpad9", 73),
    ("NumpadSubtract", 74),
    ("Numpad4", 75),
    ("Numpad5", 76),
    ("Numpad6", 77),
    ("NumpadAdd", 78),
    ("Numpad1", 79),
    ("Numpad2", 80),
    ("Numpad3", 81),
    ("Numpad0", 82),
    ("NumpadDecimal", 83),
    ("Lang5", 85),
    ("IntlBackslash", 86),
    ("F11", 87),
    ("F12", 88),
    ("IntlRo", 89),
    ("Lang3", 90),
    ("Lang4", 91),
    ("Convert", 92),
    ("KanaMode", 93),
    ("NonConvert", 94),
    ("NumpadEnter", 96),
    ("ControlRight", 97),
    ("NumpadDivide", 98),
    ("PrintScreen", 99),
    ("AltRight", 100),
    ("Home", 102),
    ("ArrowUp", 103),
    ("PageUp", 104),
    ("ArrowLeft", 105),
    ("ArrowRight", 106),
    ("End", 107),
    ("ArrowDown", 108),
    ("PageDown", 109),
    ("Insert", 110),
    ("Delete", 111),
    ("AudioVolumeMute", 113),
    ("AudioVolumeDown", 114),
    ("AudioVolumeUp", 115),
    ("Power", 116),
    ("NumpadEqual", 117),
    ("Pause", 119),
    ("NumpadComma", 121),
    ("Lang1", 122),
    ("Lang2", 123),
    ("IntlYen", 124),
    ("MetaLeft", 125),
    ("MetaRight", 126),
    ("ContextMenu", 127),
    ("Stop", 128),
    ("Again", 129),
    ("Props", 130),
    ("Undo", 131),
    ("Front", 132),
    ("Copy", 133),
    ("Open", 134),
    ("Paste", 135),
    ("Find", 136),
    ("Cut", 137),
    ("Help", 138),
    ("Menu", 139),
    ("Calculator", 140),
    ("Sleep", 142),
    ("WakeUp", 143),
    ("LaunchMail", 155),
    ("BrowserFavorites", 156),
    ("BrowserBack", 158),
    ("BrowserForward", 159),
    ("MediaTrackNext", 163),
    ("MediaPlayPause", 164),
    ("MediaTrackPrevious", 165),
    ("MediaStop", 166),
    ("BrowserHome", 172),
    ("BrowserRefresh", 173),
    ("F13", 183),
    ("F14", 184),
    ("F15", 185),
    ("F16", 186),
    ("F17", 187),
    ("F18", 188),
    ("F19", 189),
    ("F20", 190),
    ("F21", 191),
    ("F22", 192),
    ("F23", 193),
    ("F24", 194),
    ("BrowserSearch", 217),
    ("BrightnessDown", 224),
    ("BrightnessUp", 225),
    ("MicMute", 248),
    ("Any", 249),
    ("Shift", 250),
    ("Ctrl", 251),
    ("Meta", 252),
    ("Virtual1", 253),
    ("Virtual2", 254),
    ("Virtual3", 255),
    ("Virtual4", 256),
    ("Virtual5", 257),
    ("Virtual6", 258),
    ("Virtual7", 259),
    ("Virtual8", 260),
    // aliases; the canonical entries above take precedence when formatting
    ("Esc", 1),
    ("Up", 103),
    ("Left", 105),
    ("Right", 106),
    ("Down", 108),
    ("Control", 251),
];

/// Look up a key by its surface name. Matching is case-sensitive.
pub fn key_by_name(name: &str) -> Option<Key> {
    KEY_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| Key(*code))
}

/// Canonical name of a key, `"Unknown"` for codes without a table entry.
pub fn name_by_key(key: Key) -> &'static str {
    KEY_NAMES
        .iter()
        .find(|(_, code)| *code == key.0)
        .map(|(name, _)| *name)
        .unwrap_or("Unknown")
}
