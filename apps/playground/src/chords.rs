use lore_canvas::{Key, ModifiersState};

/// Parses a typed chord such as `ctrl+shift+z` or `delete`.
pub fn parse_chord(input: &str) -> Option<(Key, ModifiersState)> {
    let mut modifiers = ModifiersState::default();
    let mut key = None;
    for part in input.split('+').map(|p| p.trim().to_ascii_lowercase()) {
        match part.as_str() {
            "ctrl" | "control" => modifiers.ctrl = true,
            "cmd" | "meta" | "super" => modifiers.meta = true,
            "shift" => modifiers.shift = true,
            "alt" | "option" => modifiers.alt = true,
            "s" => key = Some(Key::S),
            "y" => key = Some(Key::Y),
            "z" => key = Some(Key::Z),
            "delete" | "del" => key = Some(Key::Delete),
            "backspace" => key = Some(Key::Backspace),
            _ => return None,
        }
    }
    key.map(|k| (k, modifiers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_canvas::{command_for, EditorCommand};

    #[test]
    fn chords_map_to_commands() {
        let (key, mods) = parse_chord("ctrl+shift+z").unwrap();
        assert_eq!(command_for(key, mods, false), Some(EditorCommand::Redo));

        let (key, mods) = parse_chord("Cmd+S").unwrap();
        assert_eq!(command_for(key, mods, false), Some(EditorCommand::Save));

        let (key, mods) = parse_chord("delete").unwrap();
        assert_eq!(command_for(key, mods, false), Some(EditorCommand::DeleteSelection));
    }

    #[test]
    fn unknown_chords_are_rejected() {
        assert!(parse_chord("ctrl+q").is_none());
        assert!(parse_chord("shift").is_none());
    }
}
