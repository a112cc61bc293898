use std::collections::HashMap;
use std::mem;

use evdev::Key;

/// Key event value reported by evdev for a key release.
pub const KEY_UP: i32 = 0;

/// Mapping from the scale's physical keys to digit characters, plus the two
/// control keys.
///
/// The scale only ever emits digits, enter, and the discard trigger. The map
/// is a configuration surface: a scale firmware with a different layout gets
/// a different map, the decoder itself stays untouched.
#[derive(Debug, Clone)]
pub struct KeyMap {
    digits: HashMap<Key, char>,
    terminate: Key,
    discard: Key,
}

impl KeyMap {
    pub fn new(digits: &[(Key, char)], terminate: Key, discard: Key) -> Self {
        KeyMap {
            digits: digits.iter().copied().collect(),
            terminate,
            discard,
        }
    }
}

impl Default for KeyMap {
    /// The stock layout: `KEY_0`..`KEY_9`, enter terminates a reading, and
    /// right shift marks the current reading as garbage.
    fn default() -> Self {
        KeyMap::new(
            &[
                (Key::KEY_0, '0'),
                (Key::KEY_1, '1'),
                (Key::KEY_2, '2'),
                (Key::KEY_3, '3'),
                (Key::KEY_4, '4'),
                (Key::KEY_5, '5'),
                (Key::KEY_6, '6'),
                (Key::KEY_7, '7'),
                (Key::KEY_8, '8'),
                (Key::KEY_9, '9'),
            ],
            Key::KEY_ENTER,
            Key::KEY_RIGHTSHIFT,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Digits are swallowed until the next terminate key. Entered when the
    /// scale flags the current line as garbage via the discard trigger.
    Suppressed,
}

/// Assembles completed readings from the scale's raw key events.
///
/// One decoder lives for exactly one device connection. A reconnect gets a
/// fresh instance, so no partial line ever leaks across connections.
#[derive(Debug)]
pub struct LineDecoder {
    map: KeyMap,
    line: String,
    mode: Mode,
}

impl LineDecoder {
    pub fn new(map: KeyMap) -> Self {
        LineDecoder {
            map,
            line: String::new(),
            mode: Mode::Normal,
        }
    }

    /// Handles one key event, emitting a completed reading when the
    /// terminate key is released.
    ///
    /// Only key releases are considered; presses and auto-repeats are
    /// ignored. The emitted reading may be empty, which downstream treats
    /// as "no value".
    pub fn handle_key(&mut self, key: Key, value: i32) -> Option<String> {
        if value != KEY_UP {
            return None;
        }

        if key == self.map.terminate {
            self.mode = Mode::Normal;
            return Some(mem::take(&mut self.line));
        }

        if key == self.map.discard {
            self.mode = Mode::Suppressed;
            self.line.clear();
            return None;
        }

        if self.mode == Mode::Normal {
            if let Some(digit) = self.map.digits.get(&key) {
                self.line.push(*digit);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(decoder: &mut LineDecoder, key: Key) -> Option<String> {
        decoder.handle_key(key, KEY_UP)
    }

    #[test]
    fn digits_accumulate_until_enter() {
        let mut decoder = LineDecoder::new(KeyMap::default());
        assert_eq!(release(&mut decoder, Key::KEY_3), None);
        assert_eq!(release(&mut decoder, Key::KEY_2), None);
        assert_eq!(release(&mut decoder, Key::KEY_ENTER), Some("32".to_string()));
    }

    #[test]
    fn key_presses_and_repeats_are_ignored() {
        let mut decoder = LineDecoder::new(KeyMap::default());
        assert_eq!(decoder.handle_key(Key::KEY_4, 1), None);
        assert_eq!(decoder.handle_key(Key::KEY_4, 2), None);
        assert_eq!(release(&mut decoder, Key::KEY_ENTER), Some(String::new()));
    }

    #[test]
    fn enter_resets_the_accumulator() {
        let mut decoder = LineDecoder::new(KeyMap::default());
        release(&mut decoder, Key::KEY_7);
        release(&mut decoder, Key::KEY_ENTER);
        release(&mut decoder, Key::KEY_8);
        assert_eq!(release(&mut decoder, Key::KEY_ENTER), Some("8".to_string()));
    }

    #[test]
    fn enter_with_no_digits_emits_an_empty_reading() {
        let mut decoder = LineDecoder::new(KeyMap::default());
        assert_eq!(release(&mut decoder, Key::KEY_ENTER), Some(String::new()));
    }

    #[test]
    fn discard_trigger_suppresses_the_whole_line() {
        let mut decoder = LineDecoder::new(KeyMap::default());
        release(&mut decoder, Key::KEY_1);
        release(&mut decoder, Key::KEY_RIGHTSHIFT);
        release(&mut decoder, Key::KEY_5);
        assert_eq!(release(&mut decoder, Key::KEY_ENTER), Some(String::new()));
    }

    #[test]
    fn suppression_ends_at_the_terminate_key() {
        let mut decoder = LineDecoder::new(KeyMap::default());
        release(&mut decoder, Key::KEY_RIGHTSHIFT);
        release(&mut decoder, Key::KEY_ENTER);
        release(&mut decoder, Key::KEY_9);
        assert_eq!(release(&mut decoder, Key::KEY_ENTER), Some("9".to_string()));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut decoder = LineDecoder::new(KeyMap::default());
        release(&mut decoder, Key::KEY_A);
        release(&mut decoder, Key::KEY_6);
        assert_eq!(release(&mut decoder, Key::KEY_ENTER), Some("6".to_string()));
    }

    #[test]
    fn custom_key_map_is_honored() {
        let map = KeyMap::new(&[(Key::KEY_KP1, '1')], Key::KEY_KPENTER, Key::KEY_LEFTSHIFT);
        let mut decoder = LineDecoder::new(map);
        release(&mut decoder, Key::KEY_KP1);
        release(&mut decoder, Key::KEY_1);
        assert_eq!(
            release(&mut decoder, Key::KEY_KPENTER),
            Some("1".to_string())
        );
    }
}
