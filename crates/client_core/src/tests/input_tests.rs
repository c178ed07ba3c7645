use super::*;
use crate::render::FixedClock;

const CLOCK: FixedClock = FixedClock { hour: 9, minute: 5 };

#[test]
fn submit_trims_emits_once_and_clears() {
    let mut input = InputController::default();
    input.set_value("  hello world \n", None);

    let request = input.submit(&CLOCK);
    assert_eq!(
        request,
        Some(ClientRequest::SendMessage {
            message: "hello world".to_string(),
            timestamp: "09:05".to_string(),
        })
    );
    assert_eq!(input.value(), "");
    assert_eq!(input.rows(), 1);
    assert_eq!(input.submit(&CLOCK), None);
}

#[test]
fn whitespace_only_input_is_left_alone() {
    for blank in ["", " ", "\n\t  \n"] {
        let mut input = InputController::default();
        input.set_value(blank, None);
        assert_eq!(input.submit(&CLOCK), None);
        assert_eq!(input.value(), blank);
    }
}

#[test]
fn enter_submits_and_shift_enter_breaks_line() {
    let mut input = InputController::default();
    for c in "hi".chars() {
        assert_eq!(input.on_key(KeyPress::plain(Key::Char(c)), &CLOCK), None);
    }
    assert_eq!(input.on_key(KeyPress::shifted(Key::Enter), &CLOCK), None);
    input.on_key(KeyPress::plain(Key::Char('x')), &CLOCK);
    assert_eq!(input.value(), "hi\nx");
    assert_eq!(input.rows(), 2);

    let sent = input.on_key(KeyPress::plain(Key::Enter), &CLOCK);
    assert!(matches!(sent, Some(ClientRequest::SendMessage { message, .. }) if message == "hi\nx"));
    assert_eq!(input.value(), "");
}

#[test]
fn autosize_grows_shrinks_and_caps() {
    let mut input = InputController::default();
    input.set_value("a\nb\nc", None);
    assert_eq!(input.rows(), 3);
    input.set_value("1\n2\n3\n4\n5\n6\n7\n8", None);
    assert_eq!(input.rows(), MAX_COMPOSE_ROWS);
    input.set_value("short", None);
    assert_eq!(input.rows(), 1);
}

#[test]
fn emoji_inserts_at_cursor_and_focuses() {
    let mut input = InputController::default();
    input.set_value("你好世界", Some(2));
    input.insert_emoji("😀");

    assert_eq!(input.value(), "你好😀世界");
    assert_eq!(input.cursor(), 3);
    assert!(input.is_focused());

    input.on_key(KeyPress::plain(Key::Backspace), &CLOCK);
    assert_eq!(input.value(), "你好世界");
    assert_eq!(input.cursor(), 2);
}

#[test]
fn emoji_appends_when_cursor_at_end() {
    let mut input = InputController::default();
    input.set_value("hey", None);
    input.insert_emoji("👍");
    assert_eq!(input.value(), "hey👍");
}

#[test]
fn picker_toggles_and_closes_on_outside_click() {
    let mut input = InputController::default();
    assert!(!input.is_emoji_picker_open());

    input.on_click(ClickTarget::EmojiButton);
    assert!(input.is_emoji_picker_open());
    input.on_click(ClickTarget::EmojiPicker);
    assert!(input.is_emoji_picker_open());
    input.on_click(ClickTarget::Elsewhere);
    assert!(!input.is_emoji_picker_open());

    input.toggle_emoji_picker();
    input.on_click_outside();
    assert!(!input.is_emoji_picker_open());
}

#[test]
fn cursor_is_clamped_to_text() {
    let mut input = InputController::default();
    input.set_value("abc", Some(10));
    assert_eq!(input.cursor(), 3);
    input.set_cursor(0);
    input.insert_text(">");
    assert_eq!(input.value(), ">abc");
}
