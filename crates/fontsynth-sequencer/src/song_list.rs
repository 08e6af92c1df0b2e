//! Ordered song list with wrap-around navigation and shuffle.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use fontsynth_midi::MidiSequence;

pub(crate) struct SongList {
    songs: Vec<Arc<MidiSequence>>,
    /// Position in play order.
    position: usize,
    /// Play order as indexes into `songs`; identity unless shuffling.
    order: Vec<usize>,
    shuffle: bool,
    rng: StdRng,
}

impl SongList {
    pub(crate) fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            songs: Vec::new(),
            position: 0,
            order: Vec::new(),
            shuffle: false,
            rng,
        }
    }

    /// Replace the list and start from the first song in play order.
    pub(crate) fn replace(&mut self, songs: Vec<Arc<MidiSequence>>) {
        self.songs = songs;
        self.position = 0;
        self.rebuild_order();
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.songs.len()
    }

    pub(crate) fn songs(&self) -> &[Arc<MidiSequence>] {
        &self.songs
    }

    /// Index into the loaded list of the song at the current position.
    pub(crate) fn current_index(&self) -> Option<usize> {
        self.order.get(self.position).copied()
    }

    pub(crate) fn current(&self) -> Option<&Arc<MidiSequence>> {
        self.current_index().and_then(|index| self.songs.get(index))
    }

    pub(crate) fn advance(&mut self) {
        if !self.songs.is_empty() {
            self.position = (self.position + 1) % self.songs.len();
        }
    }

    pub(crate) fn retreat(&mut self) {
        if !self.songs.is_empty() {
            self.position = self
                .position
                .checked_sub(1)
                .unwrap_or(self.songs.len() - 1);
        }
    }

    /// Jump to the song at `index` in the loaded list.
    pub(crate) fn select(&mut self, index: usize) -> bool {
        match self.order.iter().position(|&i| i == index) {
            Some(position) => {
                self.position = position;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub(crate) fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    /// Toggle shuffle. The current song keeps playing; only the order of
    /// the songs after it changes.
    pub(crate) fn set_shuffle(&mut self, shuffle: bool) {
        let current = self.current_index();
        self.shuffle = shuffle;
        self.rebuild_order();
        if let Some(index) = current {
            self.select(index);
        }
    }

    fn rebuild_order(&mut self) {
        self.order.clear();
        self.order.extend(0..self.songs.len());
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }
    }
}
