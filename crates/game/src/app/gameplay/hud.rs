use engine::{text_width_px, DrawList, PixelRect, Rgba, TextSize};

use super::dialogue::{DialogueSession, Speaker};
use super::proximity::DialoguePhase;
use super::state::GameState;

pub(crate) const TALK_PROMPT: &str = "Press Enter to talk";
const CHAT_HINT: &str = "Enter: send   Esc: leave";

const PANEL_MARGIN_PX: i32 = 20;
const PANEL_PADDING_PX: i32 = 12;
const PANEL_TRANSCRIPT_ROWS: usize = 8;
const PANEL_FILL: Rgba = [10, 10, 20, 210];
const PANEL_BORDER: Rgba = [200, 200, 220, 255];
const PLAYER_TEXT: Rgba = [170, 210, 255, 255];
const MONSTER_TEXT: Rgba = [255, 190, 120, 255];
const DRAFT_TEXT: Rgba = [240, 240, 240, 255];
const HINT_TEXT: Rgba = [140, 140, 160, 255];
const PROMPT_TEXT: Rgba = [255, 255, 255, 255];
const PROMPT_GAP_PX: i32 = 12;
const THINKING_TICKS_PER_DOT: u64 = 15;

pub(crate) fn render_hud(state: &GameState, viewport_width: u32, draw_list: &mut DrawList) {
    match state.phase() {
        DialoguePhase::Idle => {}
        DialoguePhase::PromptVisible => render_talk_prompt(state, draw_list),
        DialoguePhase::Chatting => {
            if let Some(session) = state.session() {
                render_chat_panel(session, state.tick_count(), viewport_width, draw_list);
            }
        }
    }
}

fn render_talk_prompt(state: &GameState, draw_list: &mut DrawList) {
    let size = TextSize::Large;
    let width = text_width_px(TALK_PROMPT, size);
    let enemy = &state.enemy.rect;
    let x = enemy.center_x().round() as i32 - width / 2;
    let y = enemy.y.round() as i32 - size.line_height_px() - PROMPT_GAP_PX;
    draw_list.text(TALK_PROMPT, size, PROMPT_TEXT, (x, y));
}

fn render_chat_panel(
    session: &DialogueSession,
    tick_count: u64,
    viewport_width: u32,
    draw_list: &mut DrawList,
) {
    let size = TextSize::Small;
    let line_height = size.line_height_px();
    let panel_width = (viewport_width as i32 - PANEL_MARGIN_PX * 2).max(0);
    let inner_width = (panel_width - PANEL_PADDING_PX * 2).max(0);
    let max_chars = (inner_width / size.glyph_advance_px()).max(1) as usize;

    let mut rows: Vec<(String, Rgba)> = Vec::new();
    for line in session.transcript() {
        let color = match line.speaker {
            Speaker::Player => PLAYER_TEXT,
            Speaker::Monster => MONSTER_TEXT,
        };
        let labelled = format!("{}: {}", line.speaker.label(), line.text);
        rows.extend(wrap_text(&labelled, max_chars).into_iter().map(|row| (row, color)));
    }
    if session.is_pending() {
        rows.push((
            format!("{} is thinking{}", Speaker::Monster.label(), thinking_dots(tick_count)),
            MONSTER_TEXT,
        ));
    }
    let skip = rows.len().saturating_sub(PANEL_TRANSCRIPT_ROWS);

    let draft_rows = wrap_text(&format!("> {}_", session.draft()), max_chars);
    let row_count = PANEL_TRANSCRIPT_ROWS + draft_rows.len() + 1;
    let panel_height = row_count as i32 * line_height + PANEL_PADDING_PX * 2;
    let panel = PixelRect::new(
        PANEL_MARGIN_PX,
        PANEL_MARGIN_PX,
        panel_width as u32,
        panel_height as u32,
    );
    draw_list.fill_rect(panel, PANEL_FILL);
    draw_list.outline_rect(panel, PANEL_BORDER);

    let x = panel.x + PANEL_PADDING_PX;
    let mut y = panel.y + PANEL_PADDING_PX;
    for (row, color) in rows.into_iter().skip(skip) {
        draw_list.text(row, size, color, (x, y));
        y += line_height;
    }

    y = panel.y + PANEL_PADDING_PX + PANEL_TRANSCRIPT_ROWS as i32 * line_height;
    for row in draft_rows {
        draw_list.text(row, size, DRAFT_TEXT, (x, y));
        y += line_height;
    }
    draw_list.text(CHAT_HINT, size, HINT_TEXT, (x, y));
}

/// Cycles through zero to three dots.
pub(crate) fn thinking_dots(tick_count: u64) -> &'static str {
    match (tick_count / THINKING_TICKS_PER_DOT) % 4 {
        0 => "",
        1 => ".",
        2 => "..",
        _ => "...",
    }
}

/// Greedy word wrap on character counts. Words longer than a row are split.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                rows.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            rows.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > max_chars {
            rows.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 || rows.is_empty() {
        rows.push(current);
    }
    rows
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use engine::DrawCommand;

    use super::*;
    use crate::app::gameplay::reply::{GeneratorError, InlineReplyChannel, ResponseGenerator};

    struct Growl;

    impl ResponseGenerator for Growl {
        fn generate(&self, _prompt: &str) -> Result<String, GeneratorError> {
            Ok("Grr.".to_string())
        }
    }

    fn texts(draw_list: &DrawList) -> Vec<String> {
        draw_list
            .commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick".to_string(), "brown fox".to_string()]
        );
    }

    #[test]
    fn wrap_splits_words_longer_than_a_row() {
        assert_eq!(
            wrap_text("abcdefgh ij", 3),
            vec!["abc".to_string(), "def".to_string(), "gh".to_string(), "ij".to_string()]
        );
    }

    #[test]
    fn wrap_of_empty_text_is_one_empty_row() {
        assert_eq!(wrap_text("   ", 8), vec![String::new()]);
    }

    #[test]
    fn wrapped_rows_never_exceed_the_limit() {
        let text = "Grrr... Who dares wander into my forest? I have guarded these trees since before your grandfather was born.";
        for max in 1..40 {
            for row in wrap_text(text, max) {
                assert!(row.chars().count() <= max, "max={max} row={row:?}");
            }
        }
    }

    #[test]
    fn thinking_dots_cycle() {
        let frames: Vec<&str> = (0..5)
            .map(|step| thinking_dots(step * THINKING_TICKS_PER_DOT))
            .collect();
        assert_eq!(frames, vec!["", ".", "..", "...", ""]);
    }

    #[test]
    fn chat_panel_shows_transcript_draft_and_thinking_line() {
        let mut session = DialogueSession::new(Duration::from_secs(5));
        assert!(session.submit("hello"));
        session.push_char('o');
        session.push_char('k');
        let mut draw_list = DrawList::new();

        render_chat_panel(&session, THINKING_TICKS_PER_DOT * 2, 1000, &mut draw_list);

        let lines = texts(&draw_list);
        assert!(lines.iter().any(|line| line.starts_with("Monster: Grrr")));
        assert!(lines.contains(&"Player: hello".to_string()));
        assert!(lines.contains(&"Monster is thinking..".to_string()));
        assert!(lines.contains(&"> ok_".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some(CHAT_HINT));
        assert!(matches!(
            draw_list.commands().first(),
            Some(DrawCommand::FillRect { .. })
        ));
    }

    #[test]
    fn chat_panel_keeps_only_the_latest_rows() {
        let mut session = DialogueSession::new(Duration::from_secs(5));
        let mut channel = InlineReplyChannel::new(Growl);
        for index in 0..10 {
            assert!(session.submit(&format!("line {index}")));
            session.poll(&mut channel, std::time::Instant::now());
        }
        let mut draw_list = DrawList::new();

        render_chat_panel(&session, 0, 1000, &mut draw_list);

        let lines = texts(&draw_list);
        assert!(!lines.iter().any(|line| line.starts_with("Monster: Grrr")));
        assert!(lines.contains(&"Player: line 9".to_string()));
    }
}
