//! Boundary splitter.
//!
//! Cuts text into chunks that stay below a size limit where possible, breaking
//! only after punctuation so that every request carries whole clauses. Chunks
//! borrow from the input and concatenate back to it exactly.

use regex::Regex;
use std::sync::OnceLock;

/// Arabic clause marks, CJK symbols and fullwidth forms, Latin punctuation.
const BOUNDARY_PATTERN: &str = concat!(
    "[\u{060C}\u{061B}\u{061F}]",
    "|[\u{3000}-\u{303F}\u{FE10}-\u{FE1F}\u{FE30}-\u{FE6F}\u{FF01}-\u{FF60}]",
    "|[.,!?;:]",
);

static BOUNDARY: OnceLock<Regex> = OnceLock::new();

fn boundary_regex() -> &'static Regex {
    BOUNDARY.get_or_init(|| Regex::new(BOUNDARY_PATTERN).expect("boundary pattern is valid"))
}

/// Splits `text` into chunks of fewer than `chunk_size` chars, breaking after
/// a boundary mark. ASCII whitespace following the mark stays with the chunk
/// while it still fits.
///
/// A span with no usable boundary is emitted whole, even when it is larger
/// than `chunk_size`. Empty input yields a single empty chunk.
pub fn split_chunks(text: &str, chunk_size: usize) -> Chunks<'_> {
    Chunks {
        text,
        chunk_size,
        search_from: 0,
        pos: Cursor::default(),
        scanned: Cursor::default(),
        split: None,
        done: false,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Cursor {
    byte: usize,
    chars: usize,
}

/// Candidate break: just past a mark, with the whitespace run after it.
#[derive(Clone, Copy, Debug)]
struct Split {
    mark_end: Cursor,
    trailing_ws: usize,
}

pub struct Chunks<'a> {
    text: &'a str,
    chunk_size: usize,
    search_from: usize,
    pos: Cursor,
    scanned: Cursor,
    split: Option<Split>,
    done: bool,
}

impl<'a> Chunks<'a> {
    fn advance_to(&mut self, byte: usize) -> Cursor {
        let chars = self.text[self.scanned.byte..byte].chars().count();
        self.scanned = Cursor {
            byte,
            chars: self.scanned.chars + chars,
        };
        self.scanned
    }

    fn split_after(&self, mark_end: usize, mark_start: Cursor) -> Split {
        let trailing_ws = self.text[mark_end..]
            .bytes()
            .take_while(u8::is_ascii_whitespace)
            .count();
        Split {
            mark_end: Cursor {
                byte: mark_end,
                chars: mark_start.chars + 1,
            },
            trailing_ws,
        }
    }

    /// End of the chunk starting at `pos`: whitespace is taken only while the
    /// chunk stays below `chunk_size`. Whitespace bytes are one char each.
    fn cut_at(&self, split: Split) -> Cursor {
        let len = split.mark_end.chars - self.pos.chars;
        let room = self.chunk_size.saturating_sub(1).saturating_sub(len);
        let ws = split.trailing_ws.min(room);
        Cursor {
            byte: split.mark_end.byte + ws,
            chars: split.mark_end.chars + ws,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }

        while let Some(mark) = boundary_regex().find_at(self.text, self.search_from) {
            self.search_from = mark.end();
            let start = self.advance_to(mark.start());
            let split = self.split_after(mark.end(), start);
            let span = start.chars - self.pos.chars + 1;

            match self.split {
                Some(best) if span >= self.chunk_size => {
                    let cut = self.cut_at(best);
                    let chunk = &self.text[self.pos.byte..cut.byte];
                    self.pos = cut;
                    self.split = Some(split);
                    return Some(chunk);
                }
                _ => self.split = Some(split),
            }
        }

        self.done = true;
        Some(&self.text[self.pos.byte..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(text: &str, size: usize) -> Vec<&str> {
        split_chunks(text, size).collect()
    }

    #[test]
    fn splits_latin_sentences_after_separating_space() {
        assert_eq!(
            chunks("Hello. World. This is a test.", 10),
            vec!["Hello. ", "World. ", "This is a test."]
        );
    }

    #[test]
    fn short_text_without_boundary_is_one_chunk() {
        assert_eq!(chunks("hello world", 3000), vec!["hello world"]);
    }

    #[test]
    fn long_text_without_boundary_is_not_truncated() {
        let text = "a".repeat(50);
        assert_eq!(chunks(&text, 10), vec![text.as_str()]);
    }

    #[test]
    fn empty_text_yields_single_empty_chunk() {
        assert_eq!(chunks("", 10), vec![""]);
    }

    #[test]
    fn text_ending_on_boundary_keeps_final_chunk() {
        assert_eq!(chunks("One, two.", 3000), vec!["One, two."]);
    }

    #[test]
    fn splits_cjk_fullwidth_punctuation() {
        assert_eq!(
            chunks("今天天气很好。我们去公园吧！好的。", 8),
            vec!["今天天气很好。", "我们去公园吧！", "好的。"]
        );
    }

    #[test]
    fn splits_arabic_clause_marks() {
        assert_eq!(
            chunks("مرحبا، كيف حالك؟ بخير", 8),
            vec!["مرحبا، ", "كيف حالك؟ بخير"]
        );
    }

    fn is_boundary(c: char) -> bool {
        let mut buf = [0u8; 4];
        boundary_regex().is_match(c.encode_utf8(&mut buf))
    }

    #[test]
    fn trailing_whitespace_never_pushes_chunk_over_size() {
        assert_eq!(
            chunks("aaaaaaaa.        b.", 10),
            vec!["aaaaaaaa.", "        b."]
        );
        assert_eq!(chunks("abcdefgh. xyz. q.", 10), vec!["abcdefgh.", " xyz. q."]);
        assert_eq!(chunks("abcdefg.  xyz. q.", 10), vec!["abcdefg. ", " xyz. q."]);
    }

    #[test]
    fn ideographic_space_is_a_boundary_not_absorbed_whitespace() {
        assert!(is_boundary('\u{3000}'));
        let text = "你好。\u{3000}世界。";
        assert_eq!(chunks(text, 2).concat(), text);
    }

    #[test]
    fn recognises_each_script_class() {
        for c in ['.', ',', '!', '?', ';', ':', '،', '؛', '؟', '。', '、', '！', '？', '︐', '﹐'] {
            assert!(is_boundary(c), "{c:?} should be a boundary");
        }
        for c in ['a', ' ', '-', '中', 'ب'] {
            assert!(!is_boundary(c), "{c:?} should not be a boundary");
        }
    }

    #[test]
    fn chunks_reassemble_to_original_text() {
        let texts = [
            "",
            "no marks at all",
            "Hello. World. This is a test.",
            "Mixed: English, 中文。العربية؟ and more!!! Done.",
            "...,,,;;;",
            "  leading space. trailing space.  ",
            "line one.\nline two.\n\nline three",
        ];
        for text in texts {
            for size in [1, 2, 3, 5, 8, 13, 100, 3000] {
                let parts = chunks(text, size);
                assert!(!parts.is_empty());
                assert_eq!(parts.concat(), text, "size {size} broke {text:?}");
            }
        }
    }

    #[test]
    fn chunks_fit_when_boundaries_allow() {
        let sentence = "Lorem ipsum dolor. ";
        let text = sentence.repeat(20);
        for chunk in chunks(&text, 60) {
            assert!(chunk.chars().count() < 60, "oversized chunk {chunk:?}");
        }
    }
}
