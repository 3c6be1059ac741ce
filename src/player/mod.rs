//! Player — the terminal presenter.
//!
//! Starts a scheduler, receives its frames over a channel and draws every
//! agent's trail in the terminal. The player never touches the session; it
//! only projects the positions it is handed.

use std::io::{self, Write};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use crossterm::{cursor, event, execute, queue, style, terminal};

use crate::config::{PlaybackConfig, Projection};
use crate::engine::TrajectorySet;
use crate::scheduler;
use crate::types::{Category, PlaybackFrame, Position};

/// Rows reserved above the canvas for the title bar.
const CANVAS_OFFSET: u16 = 1;
const MIN_WIDTH: u16 = 20;
const MIN_HEIGHT: u16 = 6;
const INPUT_POLL: Duration = Duration::from_millis(10);
const TRAIL_CHAR: char = '·';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: char,
    color: Option<style::Color>,
}

impl Glyph {
    const BLANK: Glyph = Glyph {
        ch: ' ',
        color: None,
    };
}

/// Maps positions in the chosen plane onto canvas cells.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    projection: Projection,
    min: (f64, f64),
    max: (f64, f64),
    width: u16,
    height: u16,
}

impl Viewport {
    fn new(store: &TrajectorySet, projection: Projection, width: u16, height: u16) -> Self {
        let (min, max) = match store.bounds() {
            Some((lo, hi)) => (project(projection, &lo), project(projection, &hi)),
            None => ((0.0, 0.0), (0.0, 0.0)),
        };
        Self {
            projection,
            min,
            max,
            width,
            height,
        }
    }

    /// Canvas (column, row) of a position; the vertical axis points up.
    fn cell(&self, p: &Position) -> (i32, i32) {
        let (u, v) = project(self.projection, p);
        let col = scale(u, self.min.0, self.max.0, self.width);
        let row = scale(v, self.min.1, self.max.1, self.height);
        (col, self.height as i32 - 1 - row)
    }
}

fn project(projection: Projection, p: &Position) -> (f64, f64) {
    match projection {
        Projection::Side => (p.x, p.y),
        Projection::Top => (p.x, p.z),
    }
}

fn scale(value: f64, min: f64, max: f64, cells: u16) -> i32 {
    let last = cells.saturating_sub(1) as f64;
    if max <= min {
        return (last / 2.0).round() as i32;
    }
    ((value - min) / (max - min) * last).round() as i32
}

fn category_color(category: Category) -> style::Color {
    match category {
        Category::Interceptor => style::Color::Blue,
        Category::Threat => style::Color::Red,
        Category::Other => style::Color::White,
    }
}

fn category_symbol(category: Category) -> char {
    match category {
        Category::Interceptor => '◆',
        Category::Threat => '■',
        Category::Other => '●',
    }
}

pub struct Player {
    store: Arc<TrajectorySet>,
    config: PlaybackConfig,
    title: String,
    viewport: Viewport,
    grid: Vec<Vec<Glyph>>,
    last_frame: Option<PlaybackFrame>,
}

impl Player {
    pub fn new(store: Arc<TrajectorySet>, config: PlaybackConfig, title: impl Into<String>) -> Self {
        let viewport = Viewport::new(&store, config.projection, 0, 0);
        Self {
            store,
            config,
            title: title.into(),
            viewport,
            grid: Vec::new(),
            last_frame: None,
        }
    }

    /// Play the trajectories in the terminal until `q` or `Esc`.
    ///
    /// Sets up the terminal, runs the scheduler and the input loop, and
    /// restores the terminal on exit (even on error).
    pub fn play(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        if term_w < MIN_WIDTH || term_h < MIN_HEIGHT {
            bail!(
                "Terminal too small: need {}x{}, have {}x{}",
                MIN_WIDTH,
                MIN_HEIGHT,
                term_w,
                term_h,
            );
        }
        self.resize(term_w, term_h);

        let (frame_tx, frame_rx) = mpsc::channel();
        let handle = scheduler::start(self.store.clone(), &self.config, frame_tx)?;

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.run_loop(&mut stdout, &frame_rx);

        // Always restore terminal state.
        let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        // A scheduler failure is what usually ends the loop early.
        let stopped = handle.stop();
        result.and(stopped)
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    fn run_loop(
        &mut self,
        stdout: &mut io::Stdout,
        frames: &mpsc::Receiver<PlaybackFrame>,
    ) -> Result<()> {
        self.render_title(stdout)?;

        loop {
            if event::poll(INPUT_POLL)? {
                match event::read()? {
                    event::Event::Key(key) => {
                        use event::KeyCode::*;
                        if matches!(key.code, Char('q') | Esc) {
                            break;
                        }
                    }
                    event::Event::Resize(w, h) => {
                        self.resize(w, h);
                        queue!(stdout, terminal::Clear(terminal::ClearType::All))?;
                        self.render_full(stdout)?;
                    }
                    _ => {}
                }
            }

            // Only the newest frame is worth drawing.
            let mut latest = None;
            loop {
                match frames.try_recv() {
                    Ok(frame) => latest = Some(frame),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return Ok(()),
                }
            }
            if let Some(frame) = latest {
                self.show(stdout, frame)?;
            }
        }

        Ok(())
    }

    fn resize(&mut self, term_w: u16, term_h: u16) {
        // One row for the title bar, one for the status line.
        let canvas_h = term_h.saturating_sub(2);
        self.viewport = Viewport::new(&self.store, self.config.projection, term_w, canvas_h);
        self.grid = vec![vec![Glyph::BLANK; term_w as usize]; canvas_h as usize];
    }

    // -----------------------------------------------------------------------
    // Rasterizing
    // -----------------------------------------------------------------------

    fn rasterize(&self, frame: &PlaybackFrame) -> Vec<Vec<Glyph>> {
        let w = self.viewport.width as usize;
        let h = self.viewport.height as usize;
        let mut grid = vec![vec![Glyph::BLANK; w]; h];
        let mut plot = |(col, row): (i32, i32), glyph: Glyph| {
            if col >= 0 && row >= 0 && (col as usize) < w && (row as usize) < h {
                grid[row as usize][col as usize] = glyph;
            }
        };

        for agent in &frame.agents {
            let Some(trail) = &agent.trail else {
                continue;
            };
            let color = Some(category_color(agent.category));
            let dot = Glyph {
                ch: TRAIL_CHAR,
                color,
            };
            let cells: Vec<_> = trail.iter().map(|p| self.viewport.cell(p)).collect();
            for pair in cells.windows(2) {
                for cell in line(pair[0], pair[1]) {
                    plot(cell, dot);
                }
            }
            if let Some(&last) = cells.last() {
                plot(
                    last,
                    Glyph {
                        ch: category_symbol(agent.category),
                        color,
                    },
                );
            }
        }

        grid
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn show(&mut self, stdout: &mut io::Stdout, frame: PlaybackFrame) -> Result<()> {
        let next = self.rasterize(&frame);
        for (y, (prev_row, next_row)) in self.grid.iter().zip(&next).enumerate() {
            for (x, (prev, glyph)) in prev_row.iter().zip(next_row).enumerate() {
                if prev != glyph {
                    queue!(stdout, cursor::MoveTo(x as u16, y as u16 + CANVAS_OFFSET))?;
                    print_glyph(stdout, glyph)?;
                }
            }
        }
        self.grid = next;
        self.last_frame = Some(frame);
        self.render_status(stdout)?;
        stdout.flush()?;
        Ok(())
    }

    fn render_full(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        if let Some(frame) = &self.last_frame {
            self.grid = self.rasterize(frame);
        }
        self.render_title(stdout)?;
        for (y, row) in self.grid.iter().enumerate() {
            queue!(stdout, cursor::MoveTo(0, y as u16 + CANVAS_OFFSET))?;
            for glyph in row {
                print_glyph(stdout, glyph)?;
            }
        }
        self.render_status(stdout)?;
        stdout.flush()?;
        Ok(())
    }

    fn render_title(&self, stdout: &mut io::Stdout) -> Result<()> {
        let axes = match self.config.projection {
            Projection::Side => "x → / y ↑",
            Projection::Top => "x → / z ↑",
        };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::SetAttribute(style::Attribute::Bold),
            style::Print(format!(" {}", self.title)),
            style::SetAttribute(style::Attribute::Reset),
            style::SetAttribute(style::Attribute::Dim),
            style::Print(format!("  {axes}  [q][Esc] quit")),
            style::SetAttribute(style::Attribute::Reset),
        )?;
        Ok(())
    }

    fn render_status(&self, stdout: &mut io::Stdout) -> Result<()> {
        let status_y = self.viewport.height + CANVAS_OFFSET;
        let (virtual_time, visible) = match &self.last_frame {
            Some(frame) => (frame.virtual_time, frame.visible_count()),
            None => (self.store.range().min_time, 0),
        };
        let status = format!(
            " Time: {virtual_time:.2} | {visible}/{} agents visible ",
            self.store.agents().len(),
        );

        queue!(
            stdout,
            cursor::MoveTo(0, status_y),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::SetAttribute(style::Attribute::Dim),
            style::Print(status),
            style::SetAttribute(style::Attribute::Reset),
        )?;
        Ok(())
    }
}

fn print_glyph(stdout: &mut io::Stdout, glyph: &Glyph) -> Result<()> {
    let mut cs = style::ContentStyle::default();
    cs.foreground_color = glyph.color;
    queue!(
        stdout,
        style::PrintStyledContent(style::StyledContent::new(cs, glyph.ch))
    )?;
    Ok(())
}

/// Cells on the segment from `a` to `b`, both ends included.
fn line(a: (i32, i32), b: (i32, i32)) -> impl Iterator<Item = (i32, i32)> {
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs());
    (0..=steps).map(move |i| {
        if steps == 0 {
            return a;
        }
        let f = i as f64 / steps as f64;
        (
            a.0 + ((b.0 - a.0) as f64 * f).round() as i32,
            a.1 + ((b.1 - a.1) as f64 * f).round() as i32,
        )
    })
}
