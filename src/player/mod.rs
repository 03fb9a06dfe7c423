//! Player — the runtime playback controller.
//!
//! Loops a rendered frame sequence in the terminal next to the info panel.
//! Every tick the composed screen is diffed line by line against what was
//! drawn last, and only lines whose bytes changed are rewritten.

pub mod compose;
pub mod events;

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{cursor, queue, style, terminal};
use tracing::{info, warn};

use crate::types::{RenderConfig, RenderedFrame};
use compose::compose_frame;
use events::PlaybackEvent;

/// Quiet period after the last resize signal before re-laying out.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(200);

/// Everything the player needs from the outside world.
pub trait Host {
    /// Current terminal size as `(columns, rows)`.
    fn terminal_size(&mut self) -> (u16, u16);
    /// Render configuration for a terminal of the given size.
    fn layout(&mut self, term: (u16, u16)) -> RenderConfig;
    /// Rendered frames for `config`, from cache or freshly rendered.
    fn frames(&mut self, config: &RenderConfig) -> Vec<RenderedFrame>;
    /// Lines of the info panel, escape codes intact.
    fn info_lines(&mut self) -> Vec<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    /// A resize arrived; re-layout once `deadline` passes without another.
    Resizing { deadline: Instant },
    Exiting,
}

pub struct Player<W: Write, H: Host> {
    out: W,
    host: H,
    config: RenderConfig,
    frames: Vec<RenderedFrame>,
    info: Vec<Vec<u8>>,
    offset: usize,
    term: (u16, u16),
    prev_lines: Vec<Vec<u8>>,
    current_frame: usize,
    state: State,
}

impl<W: Write, H: Host> Player<W, H> {
    /// Measure the terminal, lay out and render the first frame set.
    pub fn new(out: W, mut host: H, offset: usize) -> Self {
        let term = host.terminal_size();
        let config = host.layout(term);
        let frames = host.frames(&config);
        let info = host.info_lines();
        Self {
            out,
            host,
            config,
            frames,
            info,
            offset,
            term,
            prev_lines: Vec::new(),
            current_frame: 0,
            state: State::Running,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Play until a terminate event arrives or the event stream ends.
    ///
    /// Write errors while playing are logged and the loop keeps going. The
    /// terminal is restored on every way out.
    pub fn play(&mut self, events: impl IntoIterator<Item = PlaybackEvent>) -> Result<()> {
        let result = self.enter_screen();

        if result.is_ok() {
            for event in events {
                self.handle(event, Instant::now());
                if self.state == State::Exiting {
                    break;
                }
            }
        }

        // Always restore terminal state.
        if self.state != State::Exiting {
            self.terminate();
        }

        Ok(result?)
    }

    fn enter_screen(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::DisableLineWrap,
        )?;
        self.out.flush()
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    pub fn handle(&mut self, event: PlaybackEvent, now: Instant) {
        match (self.state, event) {
            (State::Exiting, _) => {}
            (_, PlaybackEvent::Terminate) => self.terminate(),
            (_, PlaybackEvent::ResizeRequested) => {
                self.state = State::Resizing {
                    deadline: now + RESIZE_DEBOUNCE,
                };
            }
            (State::Resizing { deadline }, PlaybackEvent::Tick) => {
                if now >= deadline {
                    self.state = State::Running;
                    self.relayout();
                }
                self.tick();
            }
            (State::Running, PlaybackEvent::Tick) => self.tick(),
        }
    }

    fn tick(&mut self) {
        if let Err(e) = self.draw() {
            warn!("drawing frame failed: {e}");
            // The screen may be half written; repaint everything next tick.
            self.prev_lines.clear();
        }
    }

    fn terminate(&mut self) {
        if let Err(e) = self.exit() {
            warn!("restoring the terminal failed: {e}");
        }
        self.state = State::Exiting;
    }

    fn relayout(&mut self) {
        self.term = self.host.terminal_size();
        let config = self.host.layout(self.term);
        if (config.width, config.height) == (self.config.width, self.config.height) {
            return;
        }

        info!(
            width = config.width,
            height = config.height,
            "terminal resized, re-rendering"
        );
        if let Err(e) = self.clear_screen() {
            warn!("clearing the screen failed: {e}");
        }

        self.config = config;
        self.info = self.host.info_lines();
        self.frames = self.host.frames(&self.config);
        self.current_frame = 0;
        self.prev_lines.clear();
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn clear_screen(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0),
            terminal::DisableLineWrap,
        )?;
        self.out.flush()
    }

    fn draw(&mut self) -> io::Result<()> {
        if self.frames.is_empty() {
            return Ok(());
        }

        let frame = &self.frames[self.current_frame % self.frames.len()];
        let lines = compose_frame(frame, &self.info, self.offset, self.config.width, self.term);

        write_diff(&mut self.out, &self.prev_lines, &lines)?;
        self.out.flush()?;

        self.prev_lines = lines;
        self.current_frame += 1;
        Ok(())
    }

    /// Restore the terminal and leave the last frame in the scrollback.
    fn exit(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            terminal::LeaveAlternateScreen,
            cursor::Show,
            terminal::EnableLineWrap,
        )?;
        for line in &self.prev_lines {
            self.out.write_all(line)?;
            self.out.write_all(b"\n")?;
        }
        self.out.flush()
    }
}

/// Redraw `next` over a screen currently showing `prev`.
///
/// Starts from the home position. Lines whose bytes equal the previous
/// line at the same row are skipped with a cursor-down; every other line is
/// rewritten and cleared to the end.
pub fn write_diff<W: Write>(out: &mut W, prev: &[Vec<u8>], next: &[Vec<u8>]) -> io::Result<()> {
    queue!(out, cursor::MoveTo(0, 0))?;

    for y in 0..prev.len().max(next.len()) {
        let line = next.get(y).map_or(&[][..], Vec::as_slice);
        if prev.get(y).is_some_and(|p| p.as_slice() == line) {
            queue!(out, cursor::MoveDown(1))?;
            continue;
        }

        if line.is_empty() {
            queue!(out, style::ResetColor)?;
        } else {
            out.write_all(line)?;
        }
        queue!(out, terminal::Clear(terminal::ClearType::UntilNewLine))?;
        out.write_all(b"\r\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &[u8] = b"\x1b[1;1H";
    const DOWN: &[u8] = b"\x1b[1B";
    const CLEAR_EOL: &[u8] = b"\x1b[K";

    fn lines(rows: &[&str]) -> Vec<Vec<u8>> {
        rows.iter().map(|r| r.as_bytes().to_vec()).collect()
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        count(haystack, needle) > 0
    }

    #[test]
    fn only_changed_line_is_rewritten() {
        let prev = lines(&["l0", "l1", "l2", "l3", "l4"]);
        let next = lines(&["l0", "l1", "l2", "NEW", "l4"]);
        let mut out = Vec::new();
        write_diff(&mut out, &prev, &next).unwrap();

        let mut expected = HOME.to_vec();
        for _ in 0..3 {
            expected.extend_from_slice(DOWN);
        }
        expected.extend_from_slice(b"NEW");
        expected.extend_from_slice(CLEAR_EOL);
        expected.extend_from_slice(b"\r\n");
        expected.extend_from_slice(DOWN);
        assert_eq!(out, expected);
    }

    #[test]
    fn first_draw_writes_every_line() {
        let next = lines(&["a", "b"]);
        let mut out = Vec::new();
        write_diff(&mut out, &[], &next).unwrap();
        assert_eq!(out, b"\x1b[1;1Ha\x1b[K\r\nb\x1b[K\r\n".to_vec());
    }

    #[test]
    fn shrinking_frame_clears_leftover_lines() {
        let prev = lines(&["a", "b"]);
        let next = lines(&["a"]);
        let mut out = Vec::new();
        write_diff(&mut out, &prev, &next).unwrap();
        assert_eq!(out, b"\x1b[1;1H\x1b[1B\x1b[0m\x1b[K\r\n".to_vec());
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct FakeHost {
        term: (u16, u16),
        frames: Vec<RenderedFrame>,
        layouts: usize,
        renders: usize,
        info_calls: usize,
    }

    impl Host for FakeHost {
        fn terminal_size(&mut self) -> (u16, u16) {
            self.term
        }

        fn layout(&mut self, term: (u16, u16)) -> RenderConfig {
            self.layouts += 1;
            RenderConfig {
                width: term.0 / 4,
                height: 2,
                ..RenderConfig::default()
            }
        }

        fn frames(&mut self, _config: &RenderConfig) -> Vec<RenderedFrame> {
            self.renders += 1;
            self.frames.clone()
        }

        fn info_lines(&mut self) -> Vec<Vec<u8>> {
            self.info_calls += 1;
            vec![b"info".to_vec()]
        }
    }

    fn host(frames: &[&str]) -> FakeHost {
        FakeHost {
            term: (40, 10),
            frames: frames
                .iter()
                .map(|f| RenderedFrame(f.as_bytes().to_vec()))
                .collect(),
            ..FakeHost::default()
        }
    }

    fn player(frames: &[&str]) -> Player<Vec<u8>, FakeHost> {
        Player::new(Vec::new(), host(frames), 0)
    }

    #[test]
    fn tick_without_frames_writes_nothing() {
        let mut p = player(&[]);
        p.handle(PlaybackEvent::Tick, Instant::now());
        assert!(p.writer().is_empty());
    }

    #[test]
    fn ticks_cycle_through_frames() {
        let mut p = player(&["A\nA", "B\nB"]);
        let now = Instant::now();
        p.handle(PlaybackEvent::Tick, now);
        assert!(contains(p.writer(), b"A\x1b[0m"));

        p.writer_mut().clear();
        p.handle(PlaybackEvent::Tick, now);
        assert!(contains(p.writer(), b"B\x1b[0m"));

        p.writer_mut().clear();
        p.handle(PlaybackEvent::Tick, now);
        assert!(contains(p.writer(), b"A\x1b[0m"));
    }

    #[test]
    fn unchanged_frame_only_moves_cursor() {
        let mut p = player(&["A\nA"]);
        let now = Instant::now();
        p.handle(PlaybackEvent::Tick, now);
        p.writer_mut().clear();
        p.handle(PlaybackEvent::Tick, now);

        let out = p.writer();
        assert!(!contains(out, b"A"));
        assert_eq!(count(out, DOWN), 2);
    }

    #[test]
    fn rapid_resizes_coalesce_into_one_relayout() {
        let mut p = player(&["A"]);
        let t0 = Instant::now();
        assert_eq!(p.host.layouts, 1);

        p.host.term = (80, 10);
        p.handle(PlaybackEvent::ResizeRequested, t0);
        p.handle(PlaybackEvent::ResizeRequested, t0 + Duration::from_millis(100));
        p.handle(PlaybackEvent::ResizeRequested, t0 + Duration::from_millis(150));

        // Still inside the window opened by the last resize.
        p.handle(PlaybackEvent::Tick, t0 + Duration::from_millis(300));
        assert_eq!(p.host.layouts, 1);
        assert!(matches!(p.state(), State::Resizing { .. }));

        p.handle(PlaybackEvent::Tick, t0 + Duration::from_millis(360));
        assert_eq!(p.host.layouts, 2);
        assert_eq!(p.host.renders, 2);
        assert_eq!(p.host.info_calls, 2);
        assert_eq!(p.config().width, 20);
        assert_eq!(p.state(), State::Running);

        p.handle(PlaybackEvent::Tick, t0 + Duration::from_millis(900));
        assert_eq!(p.host.layouts, 2);
    }

    #[test]
    fn resize_to_same_grid_skips_rerender() {
        let mut p = player(&["A"]);
        let t0 = Instant::now();
        p.handle(PlaybackEvent::Tick, t0);

        p.host.term = (41, 12);
        p.handle(PlaybackEvent::ResizeRequested, t0);
        p.writer_mut().clear();
        p.handle(PlaybackEvent::Tick, t0 + RESIZE_DEBOUNCE);

        assert_eq!(p.host.layouts, 2);
        assert_eq!(p.host.renders, 1);
        assert!(!contains(p.writer(), b"\x1b[2J"));
    }

    #[test]
    fn resize_to_new_grid_clears_and_restarts() {
        let mut p = player(&["A", "B"]);
        let t0 = Instant::now();
        p.handle(PlaybackEvent::Tick, t0);

        p.host.term = (80, 10);
        p.handle(PlaybackEvent::ResizeRequested, t0);
        p.writer_mut().clear();
        p.handle(PlaybackEvent::Tick, t0 + RESIZE_DEBOUNCE);

        let out = p.writer();
        assert!(contains(out, b"\x1b[2J"));
        // Playback restarts at frame 0 with a full redraw.
        assert!(contains(out, b"A\x1b[0m"));
    }

    #[test]
    fn terminate_restores_terminal_and_prints_last_frame() {
        let mut p = player(&["A"]);
        let now = Instant::now();
        p.handle(PlaybackEvent::Tick, now);
        p.writer_mut().clear();
        p.handle(PlaybackEvent::Terminate, now);

        let out = p.writer().clone();
        assert!(out.starts_with(b"\x1b[?1049l\x1b[?25h\x1b[?7h"));
        assert!(contains(&out, b"A\x1b[0m   info\n"));
        assert_eq!(p.state(), State::Exiting);

        p.handle(PlaybackEvent::Tick, now);
        assert_eq!(p.writer(), &out);
    }

    #[test]
    fn play_stops_at_terminate() {
        let mut p = player(&["A"]);
        let events = [
            PlaybackEvent::Tick,
            PlaybackEvent::Terminate,
            PlaybackEvent::Tick,
        ];
        p.play(events).unwrap();
        let out = p.writer();
        assert!(out.starts_with(b"\x1b[?1049h\x1b[?25l\x1b[?7l"));
        assert_eq!(count(out, b"\x1b[?1049l"), 1);
        assert_eq!(p.state(), State::Exiting);
    }

    // -----------------------------------------------------------------------
    // Failing output
    // -----------------------------------------------------------------------

    /// A terminal whose `write` calls in `failing` return `WouldBlock`.
    struct Flaky {
        buf: Vec<u8>,
        calls: usize,
        failing: std::ops::Range<usize>,
    }

    impl Write for Flaky {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            let call = self.calls;
            self.calls += 1;
            if self.failing.contains(&call) {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn flaky_player(frames: &[&str], failing: std::ops::Range<usize>) -> Player<Flaky, FakeHost> {
        let out = Flaky {
            buf: Vec::new(),
            calls: 0,
            failing,
        };
        Player::new(out, host(frames), 0)
    }

    #[test]
    fn write_errors_keep_playback_running_until_terminate() {
        // The first three writes enter the alternate screen; the first tick fails.
        let mut p = flaky_player(&["A"], 4..6);
        let events = [
            PlaybackEvent::Tick,
            PlaybackEvent::Tick,
            PlaybackEvent::Tick,
            PlaybackEvent::Terminate,
        ];
        p.play(events).unwrap();

        let out = &p.writer().buf;
        assert_eq!(p.state(), State::Exiting);
        assert!(contains(out, b"A\x1b[0m   info"));
        assert_eq!(count(out, b"\x1b[?1049l"), 1);
    }

    #[test]
    fn failed_draw_repaints_every_line_next_tick() {
        let mut p = flaky_player(&["A\nA"], 0..0);
        let now = Instant::now();
        p.handle(PlaybackEvent::Tick, now);

        let failing = p.writer().calls + 1;
        p.writer_mut().failing = failing..failing + 1;
        p.handle(PlaybackEvent::Tick, now);
        assert_eq!(p.state(), State::Running);

        p.writer_mut().buf.clear();
        p.handle(PlaybackEvent::Tick, now);
        assert_eq!(count(&p.writer().buf, b"A\x1b[0m"), 2);
    }

    #[test]
    fn stream_end_restores_terminal() {
        let mut p = player(&["A"]);
        p.play([PlaybackEvent::Tick]).unwrap();
        assert_eq!(p.state(), State::Exiting);
        assert!(contains(p.writer(), b"\x1b[?1049l\x1b[?25h\x1b[?7h"));
    }

    #[test]
    fn failed_setup_still_restores_terminal() {
        let mut p = flaky_player(&["A"], 0..1);
        assert!(p.play([PlaybackEvent::Tick]).is_err());
        assert_eq!(p.state(), State::Exiting);
        assert!(contains(&p.writer().buf, b"\x1b[?1049l"));
        assert!(!contains(&p.writer().buf, b"A\x1b[0m"));
    }
}
