//! Section emphasis and the panel layout shared by every adapter.

/// Panel colors, one per section, cycling when there are more sections.
pub const SECTION_PALETTE: [[u8; 3]; 5] = [
    [0x3b, 0x82, 0xf6],
    [0x10, 0xb9, 0x81],
    [0xf5, 0x9e, 0x0b],
    [0x8b, 0x5c, 0xf6],
    [0xef, 0x44, 0x44],
];

pub const ACTIVE_PANEL_SCALE: f32 = 1.2;

pub fn section_color(index: usize) -> [u8; 3] {
    SECTION_PALETTE[index % SECTION_PALETTE.len()]
}

pub fn section_color_f32(index: usize) -> [f32; 3] {
    let [r, g, b] = section_color(index);
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

/// Coalesces section changes so only the last request before a frame counts.
#[derive(Debug, Clone, Copy)]
pub struct SectionFocus {
    applied: usize,
    pending: Option<usize>,
    section_count: usize,
}

impl SectionFocus {
    pub fn new(initial: usize, section_count: usize) -> Self {
        let section_count = section_count.max(1);
        Self {
            applied: initial.min(section_count - 1),
            pending: None,
            section_count,
        }
    }

    /// Section whose emphasis is currently drawn.
    pub fn active(&self) -> usize {
        self.applied
    }

    /// Section that will be drawn on the next frame.
    pub fn target(&self) -> usize {
        self.pending.unwrap_or(self.applied)
    }

    pub fn section_count(&self) -> usize {
        self.section_count
    }

    pub fn request(&mut self, index: usize) {
        self.pending = Some(index.min(self.section_count - 1));
    }

    /// Called once per frame. Returns the new section if emphasis changed.
    pub fn take_for_frame(&mut self) -> Option<usize> {
        let next = self.pending.take()?;
        if next == self.applied {
            return None;
        }
        self.applied = next;
        Some(next)
    }
}

/// Axis-aligned rectangle in normalized `[0, 1]` surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PanelRect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn scaled(&self, factor: f32) -> PanelRect {
        let width = self.width * factor;
        let height = self.height * factor;
        PanelRect {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }

    pub fn to_pixels(&self, surface_width: f32, surface_height: f32) -> PanelRect {
        PanelRect {
            x: self.x * surface_width,
            y: self.y * surface_height,
            width: self.width * surface_width,
            height: self.height * surface_height,
        }
    }
}

/// Grid of section panels: `ceil(sqrt(n))` columns, panels filling 70% of
/// their cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    section_count: usize,
    columns: usize,
    rows: usize,
}

const PANEL_FILL: f32 = 0.7;

impl PanelLayout {
    pub fn new(section_count: usize) -> Self {
        let section_count = section_count.max(1);
        let mut columns = 1;
        while columns * columns < section_count {
            columns += 1;
        }
        let rows = section_count.div_ceil(columns);
        Self {
            section_count,
            columns,
            rows,
        }
    }

    pub fn section_count(&self) -> usize {
        self.section_count
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn panel(&self, index: usize) -> PanelRect {
        let cell_w = 1.0 / self.columns as f32;
        let cell_h = 1.0 / self.rows as f32;
        let col = (index % self.columns) as f32;
        let row = (index / self.columns) as f32;
        let width = cell_w * PANEL_FILL;
        let height = cell_h * PANEL_FILL;
        PanelRect {
            x: col * cell_w + (cell_w - width) / 2.0,
            y: row * cell_h + (cell_h - height) / 2.0,
            width,
            height,
        }
    }

    /// Panel as drawn, with the active one enlarged.
    pub fn drawn_panel(&self, index: usize, active: usize) -> PanelRect {
        let rect = self.panel(index);
        if index == active {
            rect.scaled(ACTIVE_PANEL_SCALE)
        } else {
            rect
        }
    }

    /// Section under a normalized point. The enlarged active panel wins.
    pub fn hit_test(&self, x: f32, y: f32, active: usize) -> Option<usize> {
        if active < self.section_count && self.drawn_panel(active, active).contains(x, y) {
            return Some(active);
        }
        (0..self.section_count).find(|&i| self.panel(i).contains(x, y))
    }
}
