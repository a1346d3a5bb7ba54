/// Keys the capture view reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    Capture,
    TogglePlayback,
    CycleOnionDepth,
}

impl KeyCommand {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Space => Some(Self::Capture),
            Key::Char('p') => Some(Self::TogglePlayback),
            Key::Char('o') => Some(Self::CycleOnionDepth),
            Key::Char(_) => None,
        }
    }
}
