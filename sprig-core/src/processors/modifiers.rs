//! Event keys.
//!
//! An `sp-bind` key starting with `on` attaches a listener instead of
//! binding a property. The rest of the key is the event name followed by
//! dot-separated modifiers:
//!
//! ```text
//! onclick.prevent.stop
//! onkeyup.debounce300
//! oninput.debounce.150
//! onresize.window.once
//! ```

use std::fmt;

use smallvec::SmallVec;
use tracing::warn;

const EVENT_PREFIX: &str = "on";

/// One listener modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Stop propagation after the handler is scheduled.
    Stop,
    /// Prevent the default action.
    Prevent,
    /// Remove the listener after its first event.
    Once,
    /// Listen on the window instead of the element.
    Window,
    /// Delay the handler, restarting the delay on every event. `None` uses
    /// the configured default.
    Debounce(Option<u64>),
}

/// A parsed event key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventKey {
    pub event: String,
    pub modifiers: SmallVec<[Modifier; 4]>,
}

impl EventKey {
    /// Parse `key` as an event key. Returns `None` for property keys.
    pub fn parse(key: &str) -> Option<Self> {
        let rest = key.strip_prefix(EVENT_PREFIX)?;
        let mut segments = rest.split('.');
        let event = segments.next().filter(|event| !event.is_empty())?.to_string();

        let mut modifiers = SmallVec::new();
        let mut segments = segments.peekable();
        while let Some(segment) = segments.next() {
            let modifier = match segment {
                "stop" => Modifier::Stop,
                "prevent" => Modifier::Prevent,
                "once" => Modifier::Once,
                "window" => Modifier::Window,
                "debounce" => {
                    let ms = segments.peek().and_then(|next| parse_ms(next));
                    if ms.is_some() {
                        segments.next();
                    }
                    Modifier::Debounce(ms)
                }
                other => match other.strip_prefix("debounce").and_then(parse_ms) {
                    Some(ms) => Modifier::Debounce(Some(ms)),
                    None => {
                        warn!(key, modifier = other, "unknown event modifier");
                        continue;
                    }
                },
            };
            modifiers.push(modifier);
        }

        Some(Self { event, modifiers })
    }

    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// The debounce delay, if the key is debounced. `Some(None)` means the
    /// configured default.
    pub fn debounce(&self) -> Option<Option<u64>> {
        self.modifiers.iter().find_map(|modifier| match modifier {
            Modifier::Debounce(ms) => Some(*ms),
            _ => None,
        })
    }
}

fn parse_ms(text: &str) -> Option<u64> {
    let digits = text.strip_suffix("ms").unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", EVENT_PREFIX, self.event)?;
        for modifier in &self.modifiers {
            match modifier {
                Modifier::Stop => f.write_str(".stop")?,
                Modifier::Prevent => f.write_str(".prevent")?,
                Modifier::Once => f.write_str(".once")?,
                Modifier::Window => f.write_str(".window")?,
                Modifier::Debounce(None) => f.write_str(".debounce")?,
                Modifier::Debounce(Some(ms)) => write!(f, ".debounce{ms}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_keys_are_not_events() {
        assert_eq!(EventKey::parse("textContent"), None);
        assert_eq!(EventKey::parse("on"), None);
        assert_eq!(EventKey::parse("on.prevent"), None);
    }

    #[test]
    fn parses_event_and_modifiers() {
        let key = EventKey::parse("onclick.prevent.stop.once").unwrap();
        assert_eq!(key.event, "click");
        assert!(key.has(Modifier::Prevent));
        assert!(key.has(Modifier::Stop));
        assert!(key.has(Modifier::Once));
        assert!(!key.has(Modifier::Window));
        assert_eq!(key.debounce(), None);
    }

    #[test]
    fn debounce_delay_spellings() {
        assert_eq!(EventKey::parse("oninput.debounce300").unwrap().debounce(), Some(Some(300)));
        assert_eq!(EventKey::parse("oninput.debounce.150").unwrap().debounce(), Some(Some(150)));
        assert_eq!(EventKey::parse("oninput.debounce250ms").unwrap().debounce(), Some(Some(250)));
        assert_eq!(EventKey::parse("oninput.debounce").unwrap().debounce(), Some(None));
    }

    #[test]
    fn unknown_modifiers_are_dropped() {
        let key = EventKey::parse("onkeyup.enter.window").unwrap();
        assert_eq!(key.modifiers.as_slice(), [Modifier::Window]);
        assert_eq!(key.to_string(), "onkeyup.window");
    }
}
