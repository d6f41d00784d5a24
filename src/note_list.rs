// src/note_list.rs
//
// Ordered note container with an incremental scan cursor.
//
// Notes live in an id-keyed arena; `order` holds their ids sorted by start
// tick (ties keep insertion order). The playhead is an index into `order`,
// so removing entries can never leave it dangling. `order.len()` is the
// "end" position.

use std::collections::HashMap;

use crate::note::Note;
use crate::tempo::Tick;

/// Stable handle to a note inside one [`NoteList`].
pub type NoteId = u32;

/// Notes sorted by start tick, with a playhead for non-repeating scans.
///
/// [`NoteList::scan`] is the scheduling primitive: each call returns the
/// notes that became due since the previous call and moves the playhead
/// past them.
///
/// Mutating a note's `start` through [`NoteList::iterate`] or
/// [`NoteList::get_mut`] in a way that breaks the sort order is a caller
/// error: later queries and scans are unspecified until the order is
/// restored. Use [`NoteList::update`] to move a single note safely.
#[derive(Debug, Clone, Default)]
pub struct NoteList {
    notes: HashMap<NoteId, Note>,
    order: Vec<NoteId>,
    playhead: usize,
    /// Furthest tick the playhead has been carried past. Notes starting
    /// before it count as already played. `None` after a rewind.
    horizon: Option<Tick>,
    next_id: NoteId,
}

impl NoteList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tick of an entry; missing ids sort last.
    fn start_of(&self, id: NoteId) -> Tick {
        self.notes.get(&id).map_or(Tick::MAX, Note::start)
    }

    /// Index of the first entry whose start satisfies `pred` being false.
    fn partition(&self, pred: impl Fn(Tick) -> bool) -> usize {
        self.order.partition_point(|&id| pred(self.start_of(id)))
    }

    fn index_of(&self, id: NoteId) -> Option<usize> {
        let start = self.notes.get(&id)?.start();
        let lo = self.partition(|s| s < start);
        self.order[lo..]
            .iter()
            .position(|&other| other == id)
            .map(|offset| lo + offset)
            // Sort order was broken from outside; fall back to a linear walk.
            .or_else(|| self.order.iter().position(|&other| other == id))
    }

    /// Put `id` (already in the arena) into `order`.
    fn link(&mut self, id: NoteId) {
        let start = self.start_of(id);
        let index = self.partition(|s| s <= start);
        self.order.insert(index, id);

        let behind = self.horizon.is_some_and(|h| start < h);
        if index < self.playhead || (index == self.playhead && behind) {
            self.playhead += 1;
        }
    }

    /// Take `id` out of `order`, keeping the playhead on the same
    /// logical position (the next remaining entry if `id` was under it).
    fn unlink(&mut self, id: NoteId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.order.remove(index);
        if index < self.playhead {
            self.playhead -= 1;
        }
        true
    }

    // -------------------------------
    // MARK: Mutation
    // -------------------------------

    /// Insert a note in start order. Equal starts keep insertion order.
    ///
    /// A note that starts behind the scanned horizon is not picked up by
    /// later scans until the list is rewound or re-seated.
    pub fn add(&mut self, note: Note) -> NoteId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.notes.insert(id, note);
        self.link(id);
        id
    }

    /// Remove a note by id. Returns `None` if it isn't in the list.
    pub fn remove(&mut self, id: NoteId) -> Option<Note> {
        if !self.unlink(id) {
            return None;
        }
        self.notes.remove(&id)
    }

    /// Remove the first note (in order) whose fields all equal `note`.
    pub fn remove_note(&mut self, note: &Note) -> Option<Note> {
        let id = self
            .order
            .iter()
            .copied()
            .find(|id| self.notes.get(id) == Some(note))?;
        self.remove(id)
    }

    /// Apply `f` to one note and re-sort it.
    ///
    /// Returns `false` if `id` is unknown.
    pub fn update<F: FnOnce(&mut Note)>(&mut self, id: NoteId, f: F) -> bool {
        if !self.unlink(id) {
            return false;
        }
        if let Some(note) = self.notes.get_mut(&id) {
            f(note);
        }
        self.link(id);
        true
    }

    /// Drop every note and reset the playhead.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.order.clear();
        self.playhead = 0;
        self.horizon = None;
    }

    /// Call `f` on every note in order. Sort order is not re-checked.
    pub fn iterate<F: FnMut(&mut Note)>(&mut self, mut f: F) {
        for id in &self.order {
            if let Some(note) = self.notes.get_mut(id) {
                f(note);
            }
        }
    }

    // -------------------------------
    // MARK: Access
    // -------------------------------

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.contains_key(&id)
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    /// Direct mutable access. Changing `start` here can break ordering;
    /// see the type docs.
    pub fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(&id)
    }

    /// First note in order.
    pub fn head(&self) -> Option<&Note> {
        self.order.first().and_then(|id| self.notes.get(id))
    }

    /// Entries in order. Does not touch the playhead.
    pub fn iter(&self) -> impl Iterator<Item = (NoteId, &Note)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.notes.get(&id).map(|note| (id, note)))
    }

    /// Ordered snapshot of all notes.
    pub fn to_vec(&self) -> Vec<Note> {
        self.iter().map(|(_, note)| *note).collect()
    }

    // -------------------------------
    // MARK: Queries
    // -------------------------------

    /// The note at `pitch` sounding at `tick` (`start <= tick < end`).
    pub fn find_note_at_position(&self, pitch: u8, tick: Tick) -> Option<NoteId> {
        let candidates = self.partition(|s| s <= tick);
        self.order[..candidates].iter().rev().copied().find(|id| {
            self.notes
                .get(id)
                .is_some_and(|note| note.pitch() == pitch && note.covers(tick))
        })
    }

    /// Notes whose start lies in the closed range `[start, end]`.
    pub fn find_notes_in_time_span(&self, start: Tick, end: Tick) -> Vec<NoteId> {
        if start > end {
            return Vec::new();
        }
        let lo = self.partition(|s| s < start);
        let hi = self.partition(|s| s <= end);
        self.order[lo..hi].to_vec()
    }

    /// Notes starting in `[start, end]` with pitch in `[min_pitch, max_pitch]`.
    pub fn find_notes_in_area(
        &self,
        min_pitch: u8,
        max_pitch: u8,
        start: Tick,
        end: Tick,
    ) -> Vec<NoteId> {
        let pitches = min_pitch..=max_pitch;
        self.find_notes_in_time_span(start, end)
            .into_iter()
            .filter(|id| {
                self.notes
                    .get(id)
                    .is_some_and(|note| pitches.contains(&note.pitch()))
            })
            .collect()
    }

    /// Notes starting in the half-open range `[from, to)`, in order.
    ///
    /// Reads ahead without touching the playhead.
    pub fn notes_starting_in(&self, from: Tick, to: Tick) -> impl Iterator<Item = &Note> + '_ {
        let lo = self.partition(|s| s < from);
        let hi = self.partition(|s| s < to).max(lo);
        self.order[lo..hi].iter().filter_map(|id| self.notes.get(id))
    }

    // -------------------------------
    // MARK: Playhead
    // -------------------------------

    /// Note under the playhead, or `None` at the end.
    pub fn playhead(&self) -> Option<NoteId> {
        self.order.get(self.playhead).copied()
    }

    /// Move the playhead back to the first note.
    pub fn rewind(&mut self) {
        self.playhead = 0;
        self.horizon = None;
    }

    /// Put the playhead on the first note with `start >= tick`.
    ///
    /// Works for forward and backward seeks.
    pub fn set_playhead_at_tick(&mut self, tick: Tick) {
        self.playhead = self.partition(|s| s < tick);
        self.horizon = Some(tick);
    }

    /// Collect every not-yet-scanned note with `start < end`, advancing
    /// the playhead past them.
    ///
    /// Returns `None` when nothing new became due, e.g. when called again
    /// with the same or a smaller `end`.
    pub fn scan(&mut self, end: Tick) -> Option<Vec<Note>> {
        let mut due = Vec::new();

        while let Some(&id) = self.order.get(self.playhead) {
            match self.notes.get(&id) {
                Some(note) if note.start() >= end => break,
                Some(note) => due.push(*note),
                None => {}
            }
            self.playhead += 1;
        }

        self.horizon = Some(self.horizon.map_or(end, |h| h.max(end)));

        if due.is_empty() { None } else { Some(due) }
    }
}

impl Extend<Note> for NoteList {
    fn extend<I: IntoIterator<Item = Note>>(&mut self, notes: I) {
        for note in notes {
            self.add(note);
        }
    }
}

impl FromIterator<Note> for NoteList {
    fn from_iter<I: IntoIterator<Item = Note>>(notes: I) -> Self {
        let mut list = Self::new();
        list.extend(notes);
        list
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Scattered fixture: pitch and velocity equal the row index.
    pub(crate) const TEST_DATA: [(u8, u8, Tick, Tick); 127] = [
        (0, 0, 997, 1007), (1, 1, 534, 613), (2, 2, 988, 1102),
        (3, 3, 85, 141), (4, 4, 1001, 1108), (5, 5, 722, 832),
        (6, 6, 751, 779), (7, 7, 720, 730), (8, 8, 1188, 1265),
        (9, 9, 992, 1007), (10, 10, 255, 374), (11, 11, 143, 158),
        (12, 12, 565, 684), (13, 13, 286, 327), (14, 14, 215, 264),
        (15, 15, 806, 833), (16, 16, 255, 269), (17, 17, 134, 216),
        (18, 18, 993, 1102), (19, 19, 1006, 1114), (20, 20, 794, 813),
        (21, 21, 773, 807), (22, 22, 1065, 1088), (23, 23, 1010, 1051),
        (24, 24, 792, 840), (25, 25, 1114, 1178), (26, 26, 266, 318),
        (27, 27, 1005, 1034), (28, 28, 307, 391), (29, 29, 573, 676),
        (30, 30, 701, 805), (31, 31, 648, 687), (32, 32, 437, 474),
        (33, 33, 158, 265), (34, 34, 680, 718), (35, 35, 227, 337),
        (36, 36, 510, 592), (37, 37, 792, 825), (38, 38, 260, 294),
        (39, 39, 518, 590), (40, 40, 350, 419), (41, 41, 493, 562),
        (42, 42, 968, 993), (43, 43, 721, 746), (44, 44, 299, 340),
        (45, 45, 484, 557), (46, 46, 485, 505), (47, 47, 1091, 1149),
        (48, 48, 800, 826), (49, 49, 360, 443), (50, 50, 356, 463),
        (51, 51, 668, 753), (52, 52, 227, 248), (53, 53, 245, 321),
        (54, 54, 457, 487), (55, 55, 1059, 1139), (56, 56, 1148, 1190),
        (57, 57, 12, 31), (58, 58, 799, 852), (59, 59, 515, 529),
        (60, 60, 627, 682), (61, 61, 651, 678), (62, 62, 431, 535),
        (63, 63, 1082, 1147), (64, 64, 1189, 1288), (65, 65, 1085, 1147),
        (66, 66, 819, 935), (67, 67, 658, 685), (68, 68, 941, 1010),
        (69, 69, 587, 702), (70, 70, 434, 495), (71, 71, 35, 60),
        (72, 72, 677, 792), (73, 73, 230, 307), (74, 74, 149, 183),
        (75, 75, 303, 357), (76, 76, 632, 683), (77, 77, 484, 576),
        (78, 78, 415, 432), (79, 79, 781, 838), (80, 80, 556, 577),
        (81, 81, 55, 164), (82, 82, 522, 550), (83, 83, 566, 626),
        (84, 84, 1012, 1061), (85, 85, 734, 789), (86, 86, 587, 685),
        (87, 87, 232, 248), (88, 88, 707, 729), (89, 89, 199, 230),
        (90, 90, 683, 710), (91, 91, 183, 221), (92, 92, 495, 503),
        (93, 93, 271, 291), (94, 94, 34, 137), (95, 95, 392, 454),
        (96, 96, 499, 595), (97, 97, 99, 126), (98, 98, 808, 916),
        (99, 99, 832, 885), (100, 100, 995, 1024), (101, 101, 808, 907),
        (102, 102, 1041, 1148), (103, 103, 126, 225), (104, 104, 467, 570),
        (105, 105, 150, 160), (106, 106, 519, 571), (107, 107, 106, 125),
        (108, 108, 1072, 1184), (109, 109, 1121, 1178), (110, 110, 84, 194),
        (111, 111, 851, 954), (112, 112, 383, 469), (113, 113, 1135, 1187),
        (114, 114, 540, 576), (115, 115, 804, 892), (116, 116, 1146, 1212),
        (117, 117, 244, 353), (118, 118, 359, 468), (119, 119, 311, 362),
        (120, 120, 324, 378), (121, 121, 841, 881), (122, 122, 264, 288),
        (123, 123, 737, 815), (124, 124, 510, 525), (125, 125, 245, 286),
        (126, 126, 222, 266),
    ];

    pub(crate) fn fixture_notes() -> Vec<Note> {
        TEST_DATA
            .iter()
            .map(|&row| Note::try_from(row).unwrap())
            .collect()
    }

    fn fixture() -> NoteList {
        fixture_notes().into_iter().collect()
    }

    /// Ten notes, pitch 60+n, start 120*n, 120 ticks long.
    fn ladder() -> NoteList {
        (0..10)
            .map(|n| Note::new(60 + n as u8, 64, 120 * n, 120 * n + 120).unwrap())
            .collect()
    }

    fn starts(list: &NoteList) -> Vec<Tick> {
        list.to_vec().iter().map(Note::start).collect()
    }

    #[test]
    fn test_add_keeps_start_order() {
        let list = fixture();
        assert_eq!(list.len(), 127);
        assert_eq!(&starts(&list)[..4], &[12, 34, 35, 55]);
        assert!(starts(&list).windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(list.head().map(Note::start), Some(12));
    }

    #[test]
    fn test_equal_starts_keep_insertion_order() {
        let mut list = NoteList::new();
        let a = list.add(Note::new(60, 1, 100, 200).unwrap());
        let b = list.add(Note::new(61, 2, 100, 200).unwrap());
        let c = list.add(Note::new(62, 3, 50, 200).unwrap());
        let ids: Vec<NoteId> = list.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![c, a, b]);
    }

    #[test]
    fn test_clear() {
        let mut list = ladder();
        list.scan(500);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.head().is_none());
        assert!(list.playhead().is_none());
    }

    #[test]
    fn test_find_note_at_position() {
        let list = ladder();
        let found = list.find_note_at_position(60, 60).unwrap();
        assert_eq!(list.get(found).unwrap().pitch(), 60);
        assert!(list.find_note_at_position(61, 60).is_none());
        // end is exclusive
        assert!(list.find_note_at_position(60, 120).is_none());
        assert!(list.find_note_at_position(61, 120).is_some());
    }

    #[test]
    fn test_find_notes_in_time_span() {
        let list = ladder();
        assert_eq!(list.find_notes_in_time_span(60, 240).len(), 2);
        assert_eq!(list.find_notes_in_time_span(0, 1200).len(), 10);

        let span = list.find_notes_in_time_span(600, 960);
        let found: Vec<Tick> = span.iter().map(|&id| list.get(id).unwrap().start()).collect();
        assert_eq!(found, vec![600, 720, 840, 960]);

        assert!(list.find_notes_in_time_span(960, 600).is_empty());
    }

    #[test]
    fn test_notes_starting_in_leaves_playhead() {
        let mut list = ladder();
        list.set_playhead_at_tick(600);
        let before = list.playhead();

        let starts: Vec<Tick> = list.notes_starting_in(120, 480).map(Note::start).collect();
        assert_eq!(starts, vec![120, 240, 360]);
        assert_eq!(list.notes_starting_in(480, 480).count(), 0);
        assert_eq!(list.notes_starting_in(960, 600).count(), 0);
        assert_eq!(list.playhead(), before);
    }

    #[test]
    fn test_find_notes_in_area() {
        let list = ladder();
        assert_eq!(list.find_notes_in_area(62, 64, 60, 240).len(), 1);
        assert_eq!(list.find_notes_in_area(66, 69, 600, 960).len(), 3);
        assert_eq!(list.find_notes_in_area(60, 69, 0, 1200).len(), 10);
    }

    #[test]
    fn test_len_tracks_add_and_remove() {
        let notes: Vec<Note> = (0..3)
            .map(|n| Note::new(60 + n, 64, 120 * n as Tick, 120 * n as Tick + 120).unwrap())
            .collect();
        let mut list = NoteList::new();
        let ids: Vec<NoteId> = notes.iter().map(|&n| list.add(n)).collect();
        assert_eq!(list.len(), 3);
        assert_eq!(list.remove(ids[0]), Some(notes[0]));
        assert_eq!(list.len(), 2);
        assert!(!list.contains(ids[0]));
        assert!(list.contains(ids[2]));
        assert!(list.remove_note(&notes[1]).is_some());
        assert_eq!(list.len(), 1);
        assert!(list.remove(ids[0]).is_none());
        assert!(list.remove_note(&notes[0]).is_none());
        assert_eq!(list.len(), 1);
        list.clear();
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_remove_half_of_fixture() {
        let notes = fixture_notes();
        let mut list = NoteList::new();
        let ids: Vec<NoteId> = notes.iter().map(|&n| list.add(n)).collect();
        for &id in &ids[..63] {
            assert!(list.remove(id).is_some());
        }
        assert_eq!(list.len(), 64);
        assert_eq!(&starts(&list)[..3], &[34, 35, 55]);
    }

    #[test]
    fn test_to_vec_snapshot() {
        let mut list = ladder();
        let notes = list.to_vec();
        assert_eq!(notes.len(), 10);
        assert_eq!(notes[0].pitch(), 60);
        assert_eq!(notes[1].start(), 120);
        assert_eq!(notes[2].end(), 360);
        // snapshot leaves the playhead alone
        assert_eq!(list.scan(240).map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_iterate_mutates_in_place() {
        let mut list = ladder();
        list.iterate(|note| {
            let half = note.duration() / 2;
            let start = note.start() / 2;
            note.set_span(start, start + half).unwrap();
        });
        let notes = list.to_vec();
        assert_eq!(notes[0].start(), 0);
        assert_eq!(notes[1].start(), 60);
        assert_eq!(notes[2].end(), 180);
    }

    #[test]
    fn test_rewind() {
        let mut list = fixture();
        list.scan(500);
        assert_ne!(list.playhead(), list.iter().next().map(|(id, _)| id));
        list.rewind();
        assert_eq!(list.playhead(), list.iter().next().map(|(id, _)| id));
    }

    #[test]
    fn test_set_playhead_at_tick() {
        let mut list = fixture();
        list.set_playhead_at_tick(480);
        let at = list.get(list.playhead().unwrap()).unwrap().start();
        assert_eq!(at, 484);
        list.set_playhead_at_tick(700);
        assert_eq!(list.get(list.playhead().unwrap()).unwrap().start(), 701);
        // backwards
        list.set_playhead_at_tick(100);
        assert!(list.get(list.playhead().unwrap()).unwrap().start() >= 100);
        list.set_playhead_at_tick(5000);
        assert!(list.playhead().is_none());
    }

    #[test]
    fn test_scan_is_non_repeating() {
        let mut list = fixture();
        list.rewind();
        assert_eq!(list.scan(480).map(|v| v.len()), Some(49));
        assert!(list.scan(480).is_none());
        assert!(list.scan(300).is_none());

        let next = list.scan(600).unwrap();
        assert_eq!(next.len(), 20);
        assert!(next.iter().all(|n| (480..600).contains(&n.start())));
    }

    #[test]
    fn test_scan_empty_list() {
        let mut list = NoteList::new();
        assert!(list.scan(10_000).is_none());
    }

    #[test]
    fn test_remove_under_playhead_advances() {
        let mut list = ladder();
        list.set_playhead_at_tick(240);
        let under = list.playhead().unwrap();
        assert_eq!(list.get(under).unwrap().start(), 240);

        list.remove(under);
        let next = list.playhead().unwrap();
        assert_eq!(list.get(next).unwrap().start(), 360);

        // removing behind the playhead keeps it on the same note
        let first = list.iter().next().map(|(id, _)| id).unwrap();
        list.remove(first);
        assert_eq!(list.playhead(), Some(next));
        assert_eq!(list.scan(480).map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_add_behind_horizon_is_not_replayed() {
        let mut list = ladder();
        assert_eq!(list.scan(480).map(|v| v.len()), Some(4));

        // starts behind what was already scanned
        list.add(Note::new(40, 64, 100, 200).unwrap());
        list.add(Note::new(41, 64, 470, 500).unwrap());
        // starts ahead of it
        list.add(Note::new(42, 64, 500, 600).unwrap());

        let next = list.scan(600).unwrap();
        let pitches: Vec<u8> = next.iter().map(Note::pitch).collect();
        assert_eq!(pitches, vec![64, 42]);
    }

    #[test]
    fn test_add_after_exhausted_scan() {
        let mut list = ladder();
        assert_eq!(list.scan(5000).map(|v| v.len()), Some(10));
        list.add(Note::new(30, 64, 6000, 6100).unwrap());
        assert_eq!(list.scan(7000).map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_update_resorts_single_note() {
        let mut list = ladder();
        let first = list.find_note_at_position(60, 0).unwrap();
        assert!(list.update(first, |note| note.move_time(2000)));
        assert_eq!(starts(&list).last(), Some(&2000));
        assert!(starts(&list).windows(2).all(|w| w[0] <= w[1]));
        assert!(!list.update(9999, |_| {}));
    }
}
