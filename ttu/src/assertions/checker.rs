use crate::trace::TraceEntry;

use super::{Error, Fact, Result};

/// A predicate over one trace entry, carrying the name used in failure
/// reports
pub struct NamedPredicate<T> {
    name: String,
    check: Box<dyn Fn(&T) -> bool>,
}

impl<T> NamedPredicate<T> {
    pub fn new<N: ToString + ?Sized, F>(name: &N, check: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Self {
            name: name.to_string(),
            check: Box::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passes(&self, entry: &T) -> bool {
        (self.check)(entry)
    }
}

/// Predicates that must all hold over one consecutive range of entries
struct AssertionBlock<T> {
    predicates: Vec<NamedPredicate<T>>,
}

impl<T> AssertionBlock<T> {
    fn passes(&self, entry: &T) -> bool {
        self.predicates.iter().all(|p| p.passes(entry))
    }

    fn failing_predicate(&self, entry: &T) -> Option<&NamedPredicate<T>> {
        self.predicates.iter().find(|p| !p.passes(entry))
    }

    fn names(&self) -> String {
        self.predicates
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

#[derive(Clone, Copy)]
enum State {
    /// Looking for the first entry the current block matches
    Scanning,
    /// The current block has matched at least one consecutive entry
    MatchedRange,
}

/// Checks blocks of predicates against an ordered sequence of entries.
///
/// Each block must hold over at least one consecutive sub-range, and the
/// ranges must appear in block order. When the current block stops matching,
/// the same entry is re-checked against the next block; an entry neither
/// block accepts fails the whole check, and trailing blocks that never got a
/// matching range fail it too.
pub struct AssertionsChecker<T> {
    blocks: Vec<AssertionBlock<T>>,
}

impl<T: TraceEntry> AssertionsChecker<T> {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Add a predicate to the current block
    pub fn append(&mut self, predicate: NamedPredicate<T>) {
        if self.blocks.is_empty() {
            self.blocks.push(AssertionBlock {
                predicates: Vec::new(),
            });
        }
        self.blocks
            .last_mut()
            .expect("just ensured non-empty")
            .predicates
            .push(predicate);
    }

    /// Close the current block; following appends go to a new block that must
    /// match a later sub-range
    pub fn next_block(&mut self) {
        if self.blocks.last().map_or(true, |b| !b.predicates.is_empty()) {
            self.blocks.push(AssertionBlock {
                predicates: Vec::new(),
            });
        }
    }

    pub fn check(&self, entries: &[T]) -> Result<()> {
        // trailing empty block from a dangling next_block() is ignored
        let blocks: Vec<&AssertionBlock<T>> = self
            .blocks
            .iter()
            .filter(|b| !b.predicates.is_empty())
            .collect();

        if blocks.is_empty() {
            return Ok(());
        }

        let mut block_idx = 0;
        let mut state = State::Scanning;
        let mut i = 0;

        while i < entries.len() {
            let entry = &entries[i];
            if blocks[block_idx].passes(entry) {
                state = State::MatchedRange;
                i += 1;
                continue;
            }

            match state {
                State::MatchedRange if block_idx + 1 < blocks.len() => {
                    block_idx += 1;
                    state = State::Scanning;
                    // same entry is re-checked against the new block
                }
                _ => {
                    let failing = blocks[block_idx]
                        .failing_predicate(entry)
                        .expect("block failed so one predicate failed");
                    return Err(Error::failed(vec![
                        Fact::new("failed predicate", failing.name()),
                        Fact::new("entry timestamp", &entry.elapsed_timestamp_nanos()),
                        Fact::new("entry index", &i),
                    ]));
                }
            }
        }

        // every block must have had its range before the trace ran out
        let exhausted = block_idx + 1 < blocks.len() || matches!(state, State::Scanning);
        if exhausted {
            let unmatched = match state {
                State::Scanning => block_idx,
                State::MatchedRange => block_idx + 1,
            };
            return Err(Error::failed(vec![
                Fact::new("assertion never matched", &blocks[unmatched].names()),
                Fact::new("trace length", &entries.len()),
            ]));
        }

        Ok(())
    }
}

impl<T: TraceEntry> Default for AssertionsChecker<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Entry {
        ts: i64,
        tag: &'static str,
    }

    impl TraceEntry for Entry {
        fn elapsed_timestamp_nanos(&self) -> i64 {
            self.ts
        }
    }

    fn entries(tags: &[&'static str]) -> Vec<Entry> {
        tags.iter()
            .enumerate()
            .map(|(i, tag)| Entry {
                ts: i as i64 * 100,
                tag,
            })
            .collect()
    }

    fn tag_is(tag: &'static str) -> NamedPredicate<Entry> {
        NamedPredicate::new(&format!("tag is {tag}"), move |e: &Entry| e.tag == tag)
    }

    #[test]
    fn test_empty_checker_passes() {
        let checker = AssertionsChecker::<Entry>::new();
        checker.check(&entries(&["a", "b"])).expect("empty passes");
    }

    #[test]
    fn test_single_block_all_entries() {
        let mut checker = AssertionsChecker::new();
        checker.append(tag_is("a"));
        checker.check(&entries(&["a", "a", "a"])).expect("all match");
    }

    #[test]
    fn test_single_block_failure_names_entry() {
        let mut checker = AssertionsChecker::new();
        checker.append(tag_is("a"));
        let err = checker.check(&entries(&["a", "b"])).expect_err("b fails");
        let facts = err.facts().expect("facts");
        assert!(facts.iter().any(|f| f.key == "failed predicate"));
        assert!(facts
            .iter()
            .any(|f| f.key == "entry timestamp" && f.value == "100"));
    }

    #[test]
    fn test_then_advances_to_next_block() {
        let mut checker = AssertionsChecker::new();
        checker.append(tag_is("a"));
        checker.next_block();
        checker.append(tag_is("b"));
        checker
            .check(&entries(&["a", "a", "b", "b"]))
            .expect("a-range then b-range");
    }

    #[test]
    fn test_blocks_must_be_consecutive() {
        let mut checker = AssertionsChecker::new();
        checker.append(tag_is("a"));
        checker.next_block();
        checker.append(tag_is("b"));
        let err = checker
            .check(&entries(&["a", "c", "b"]))
            .expect_err("c breaks the chain");
        let facts = err.facts().expect("facts");
        assert!(facts
            .iter()
            .any(|f| f.key == "failed predicate" && f.value == "tag is b"));
    }

    #[test]
    fn test_unreached_block_is_exhausted() {
        let mut checker = AssertionsChecker::new();
        checker.append(tag_is("a"));
        checker.next_block();
        checker.append(tag_is("b"));
        let err = checker.check(&entries(&["a", "a"])).expect_err("no b range");
        let facts = err.facts().expect("facts");
        assert!(facts
            .iter()
            .any(|f| f.key == "assertion never matched" && f.value == "tag is b"));
    }

    #[test]
    fn test_trailing_next_block_is_ignored() {
        let mut checker = AssertionsChecker::new();
        checker.append(tag_is("a"));
        checker.next_block();
        checker.check(&entries(&["a"])).expect("dangling then is fine");
    }
}
