//! Operating-mode resolution for bidirectional FETs.
//!
//! A FET is symmetric: whichever of drain and source sits at the lower
//! (polarity-normalized) potential acts as the source. Device equations are
//! written once for the forward orientation. The [`Frame`] records which
//! orientation the last load resolved and translates between the
//! *effective* terminals the equations see and the *physical* terminals
//! the matrix is stamped on. Every load variant uses the same frame, so the
//! permutation lives in exactly one place.

/// Device terminal, including the internal prime nodes behind the series
/// resistances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    Drain,
    Gate,
    Source,
    Bulk,
    DrainPrime,
    SourcePrime,
}

impl Terminal {
    pub const COUNT: usize = 6;

    pub const ALL: [Terminal; Terminal::COUNT] = [
        Terminal::Drain,
        Terminal::Gate,
        Terminal::Source,
        Terminal::Bulk,
        Terminal::DrainPrime,
        Terminal::SourcePrime,
    ];

    /// Position in per-terminal tables.
    pub fn index(self) -> usize {
        match self {
            Terminal::Drain => 0,
            Terminal::Gate => 1,
            Terminal::Source => 2,
            Terminal::Bulk => 3,
            Terminal::DrainPrime => 4,
            Terminal::SourcePrime => 5,
        }
    }
}

/// Orientation of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// The physical source acts as the source.
    #[default]
    Forward,
    /// Drain and source have traded roles.
    Reverse,
}

impl Mode {
    /// +1 for forward, -1 for reverse.
    pub fn sign(self) -> f64 {
        match self {
            Mode::Forward => 1.0,
            Mode::Reverse => -1.0,
        }
    }
}

/// Polarity-normalized physical bias of an instance.
///
/// All voltages are referred to the source prime node and multiplied by the
/// device polarity, so an n-channel and a p-channel device at mirrored bias
/// see the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bias {
    pub vgs: f64,
    pub vds: f64,
    pub vbs: f64,
}

impl Bias {
    pub fn new(vgs: f64, vds: f64, vbs: f64) -> Self {
        Self { vgs, vds, vbs }
    }

    pub fn vgd(&self) -> f64 {
        self.vgs - self.vds
    }

    pub fn vbd(&self) -> f64 {
        self.vbs - self.vds
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.vgs, self.vds, self.vbs]
    }
}

/// Resolved orientation together with its terminal permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    mode: Mode,
}

impl Frame {
    pub const FORWARD: Frame = Frame { mode: Mode::Forward };
    pub const REVERSE: Frame = Frame { mode: Mode::Reverse };

    /// Resolve the orientation from the normalized drain-source voltage.
    pub fn resolve(vds: f64) -> Self {
        if vds >= 0.0 { Self::FORWARD } else { Self::REVERSE }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Physical terminal playing the role of effective terminal `t`.
    ///
    /// The mapping is an involution, so it also converts physical to
    /// effective.
    pub fn map(&self, t: Terminal) -> Terminal {
        match (self.mode, t) {
            (Mode::Forward, t) => t,
            (Mode::Reverse, Terminal::Drain) => Terminal::Source,
            (Mode::Reverse, Terminal::Source) => Terminal::Drain,
            (Mode::Reverse, Terminal::DrainPrime) => Terminal::SourcePrime,
            (Mode::Reverse, Terminal::SourcePrime) => Terminal::DrainPrime,
            (Mode::Reverse, t) => t,
        }
    }

    /// Order a (source-side, drain-side) pair of values effectively.
    ///
    /// Like [`map`](Self::map) this is its own inverse.
    pub fn pick<T>(&self, source_side: T, drain_side: T) -> (T, T) {
        match self.mode {
            Mode::Forward => (source_side, drain_side),
            Mode::Reverse => (drain_side, source_side),
        }
    }

    /// Effective (vgs, vds, vbs) for a physical bias.
    pub fn effective(&self, bias: &Bias) -> [f64; 3] {
        match self.mode {
            Mode::Forward => bias.as_array(),
            Mode::Reverse => [bias.vgd(), -bias.vds, bias.vbd()],
        }
    }

    /// Physical terminal pairs whose voltage differences are the effective
    /// controlling voltages (vgs, vds, vbs), in that order.
    pub fn controls(&self) -> [(Terminal, Terminal); 3] {
        let s = self.map(Terminal::SourcePrime);
        [
            (Terminal::Gate, s),
            (self.map(Terminal::DrainPrime), s),
            (Terminal::Bulk, s),
        ]
    }
}
