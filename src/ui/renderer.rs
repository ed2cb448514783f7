/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The stage is drawn in world units scaled onto whatever terminal area is
/// left below the HUD, so the arena always fits the window.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::geom::Rect;
use crate::domain::player::{PState, Player, Tint};
use crate::sim::stats;
use crate::sim::world::{MatchState, Phase};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, also used
    /// for every Clear, so row gaps on VTE terminals match the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg) }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Keep the glyph, change the background (for translucent overlays).
    fn tint_bg(&mut self, x: usize, y: usize, bg: Color) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x].bg = bg;
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Viewport: world units → terminal cells ──

/// Maps the stage rectangle onto a block of terminal cells. Axes scale
/// independently so the whole stage is always visible.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Viewport {
    col0: usize,
    row0: usize,
    cols: usize,
    rows: usize,
    sx: f32,
    sy: f32,
}

impl Viewport {
    fn fit(stage_w: f32, stage_h: f32, col0: usize, row0: usize, cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Viewport {
            col0,
            row0,
            cols,
            rows,
            sx: cols as f32 / stage_w.max(1.0),
            sy: rows as f32 / stage_h.max(1.0),
        }
    }

    fn col(&self, x: f32) -> i32 {
        self.col0 as i32 + (x * self.sx).floor() as i32
    }

    fn row(&self, y: f32) -> i32 {
        self.row0 as i32 + (y * self.sy).floor() as i32
    }

    /// Cells covered by `r`, clipped to the viewport. Every rect at least
    /// one cell in size so thin things stay visible.
    fn cells(&self, r: &Rect) -> Option<(usize, usize, usize, usize)> {
        let c0 = self.col(r.left()).max(self.col0 as i32);
        let r0 = self.row(r.top()).max(self.row0 as i32);
        let c1 = self.col(r.right()).max(self.col(r.left()) + 1).min((self.col0 + self.cols) as i32);
        let r1 = self.row(r.bottom()).max(self.row(r.top()) + 1).min((self.row0 + self.rows) as i32);
        if c0 >= c1 || r0 >= r1 {
            return None;
        }
        Some((c0 as usize, r0 as usize, c1 as usize, r1 as usize))
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const THICK_FG: Color = Color::Rgb { r: 110, g: 90, b: 70 };
const THIN_FG: Color = Color::Rgb { r: 150, g: 150, b: 170 };
const HITBOX_FG: Color = Color::Rgb { r: 255, g: 200, b: 60 };
const SPENT_FG: Color = Color::Rgb { r: 120, g: 100, b: 40 };
const SHIELD_FG: Color = Color::Rgb { r: 120, g: 200, b: 255 };
const SHIELD_LOW_FG: Color = Color::Rgb { r: 255, g: 110, b: 110 };

fn player_color(idx: usize) -> Color {
    match idx {
        0 => Color::Rgb { r: 90, g: 160, b: 255 },
        1 => Color::Rgb { r: 255, g: 110, b: 90 },
        2 => Color::Rgb { r: 110, g: 220, b: 120 },
        _ => Color::Rgb { r: 230, g: 200, b: 90 },
    }
}

fn tinted(base: Color, tint: Tint) -> Color {
    match tint {
        Tint::Normal => base,
        Tint::Hurt => Color::Rgb { r: 255, g: 255, b: 255 },
        Tint::Stunned => Color::Rgb { r: 200, g: 120, b: 255 },
        Tint::Dodging => Color::Rgb { r: 90, g: 90, b: 110 },
    }
}

// ── Renderer ──

const HUD_ROW: usize = 0;
const STAGE_ROW: usize = 2;
/// Rows below the stage: blank + help line.
const FOOTER_ROWS: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    enhanced_keys: bool,
    /// Wall-clock frame counter; keeps blinking while the match is paused.
    frame: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            enhanced_keys: false,
            frame: 0,
        }
    }

    /// Enter raw mode and the alternate screen. Returns true when the
    /// terminal will report key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        self.enhanced_keys = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.enhanced_keys {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &MatchState) -> io::Result<()> {
        self.frame = self.frame.wrapping_add(1);

        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Clean transition between playing / paused / game over.
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();

        let rows = self.term_h.saturating_sub(STAGE_ROW + FOOTER_ROWS);
        let vp = Viewport::fit(world.stage.width, world.stage.height, 0, STAGE_ROW, self.term_w, rows);

        self.compose_game(world, &vp);
        match world.phase {
            Phase::Playing => {}
            Phase::Paused => self.compose_pause_overlay(&vp),
            Phase::GameOver { winner } => self.compose_game_over(world, winner, &vp),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the terminal's
        // own default, which may differ from BASE_BG.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &MatchState, vp: &Viewport) {
        self.compose_hud(w);

        for p in &w.stage.platforms {
            let Some((c0, r0, c1, r1)) = vp.cells(&p.rect) else { continue };
            let (ch, fg) = if p.is_thin() { ('=', THIN_FG) } else { ('█', THICK_FG) };
            for row in r0..r1 {
                for col in c0..c1 {
                    self.front.set(col, row, Cell::new(ch, fg, Color::Reset));
                }
            }
        }

        for atk in &w.attacks {
            let Some((c0, r0, c1, r1)) = vp.cells(&atk.rect) else { continue };
            let fg = if atk.active { HITBOX_FG } else { SPENT_FG };
            for row in r0..r1 {
                for col in c0..c1 {
                    self.front.set(col, row, Cell::new('░', fg, Color::Reset));
                }
            }
        }

        for p in &w.players {
            self.compose_player(p, vp);
        }

        let help_row = STAGE_ROW + vp.rows + 1;
        if help_row < self.front.height {
            let help = " P1 WASD V X  │  P2 ←↑→↓ / ,  │  Esc:Pause  Ctrl-C:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_hud(&mut self, w: &MatchState) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        let mut x = 1;
        for p in &w.players {
            let label = stats::player_label(p.id);
            let status = if p.is_eliminated() {
                "OUT".to_string()
            } else if !p.is_alive() {
                format!("respawn {}", p.body.respawn_timer)
            } else {
                p.state_name().to_string()
            };
            let text = format!(
                "{} {:>5.1}%  ♥×{}  shield {:>3.0}  jumps {}  [{}]",
                label, p.body.percent, p.lives(), p.body.shield_hp, p.body.jumps_remaining, status
            );
            self.front.put_str(x, HUD_ROW, &text, player_color(p.id.0), HUD_BG);
            x += text.chars().count() + 4;
        }
    }

    fn compose_player(&mut self, p: &Player, vp: &Viewport) {
        if !p.is_alive() {
            return;
        }
        let Some((c0, r0, c1, r1)) = vp.cells(&p.body.rect) else { return };
        let fg = tinted(player_color(p.id.0), p.body.tint);
        for row in r0..r1 {
            for col in c0..c1 {
                self.front.set(col, row, Cell::new('█', fg, Color::Reset));
            }
        }

        // Eye on the facing side, label above the head.
        let eye_col = if p.body.facing_right { c1 - 1 } else { c0 };
        self.front.set(eye_col, r0, Cell::new(if p.body.facing_right { '>' } else { '<' }, Color::Black, fg));
        if r0 > STAGE_ROW {
            let label = stats::player_label(p.id);
            self.front.put_str(c0, r0 - 1, &label, fg, Color::Reset);
        }

        if p.state() == PState::Shield {
            self.compose_shield(p, (c0, r0, c1, r1));
        }
    }

    /// A bracket bubble one cell outside the body. It pops in over the first
    /// few shield ticks and turns red as the shield weakens.
    fn compose_shield(&mut self, p: &Player, (c0, r0, c1, r1): (usize, usize, usize, usize)) {
        let grown = p.body.shield_ticks >= 3;
        let fg = if p.body.shield_hp < 20.0 { SHIELD_LOW_FG } else { SHIELD_FG };
        let left = c0.saturating_sub(if grown { 1 } else { 0 });
        let right = if grown { c1 } else { c1 - 1 };
        for row in r0..r1 {
            self.front.set(left, row, Cell::new('(', fg, Color::Reset));
            self.front.set(right, row, Cell::new(')', fg, Color::Reset));
        }
    }

    fn compose_pause_overlay(&mut self, vp: &Viewport) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let blink = (self.frame / 8) % 2 == 0;

        let box_w = 30_usize.min(vp.cols);
        let box_h = 8_usize.min(vp.rows);
        let box_x = vp.col0 + vp.cols.saturating_sub(box_w) / 2;
        let box_y = vp.row0 + vp.rows.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::Reset, dim));
            }
        }

        let hdr = Color::Rgb { r: 255, g: 220, b: 50 };
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
        let pause_label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(box_x + (box_w.saturating_sub(12)) / 2, box_y + 1, pause_label, hdr, dim);
        self.front.put_str(box_x + 3, box_y + 3, "Esc  Resume", key_c, dim);
        self.front.put_str(box_x + 3, box_y + 4, "R    Restart match", key_c, dim);
        self.front.put_str(box_x + 3, box_y + 5, "Q    Quit", key_c, dim);
    }

    fn compose_game_over(&mut self, w: &MatchState, winner: Option<crate::domain::player::PlayerId>, vp: &Viewport) {
        let dim = Color::Rgb { r: 30, g: 30, b: 45 };
        for y in vp.row0..vp.row0 + vp.rows {
            for x in vp.col0..vp.col0 + vp.cols {
                self.front.tint_bg(x, y, dim);
            }
        }

        let mut lines = vec![stats::winner_announcement(winner), String::new()];
        lines.extend(stats::stats_table(&w.players).lines());
        lines.push(String::new());
        lines.push(stats::final_stocks(&w.players));
        lines.push(String::new());
        lines.push("R  Play again    Q  Quit".to_string());

        let box_w = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 6;
        let box_h = lines.len() + 2;
        let box_x = vp.col0 + vp.cols.saturating_sub(box_w) / 2;
        let box_y = vp.row0 + vp.rows.saturating_sub(box_h) / 2;
        let panel = Color::Rgb { r: 40, g: 40, b: 40 };
        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::Reset, panel));
            }
        }

        let title_fg = match winner {
            Some(id) => player_color(id.0),
            None => Color::Rgb { r: 255, g: 220, b: 50 },
        };
        for (i, line) in lines.iter().enumerate() {
            let fg = if i == 0 { title_fg } else { Color::Rgb { r: 200, g: 200, b: 200 } };
            let x = box_x + (box_w - line.chars().count()) / 2;
            self.front.put_str(x, box_y + 1 + i, line, fg, panel);
        }
    }
}
