//! Useful utilities for parsing and working with CommonMark files.

mod parser;

pub use parser::*;

use pulldown_cmark::Event;
use std::borrow::Borrow;

pub trait EventIteratorExt {
    /// Consume an event collection and return only its textual content, with inline
    /// markup dropped and line breaks collapsed to single spaces.
    fn plain_text(self) -> String;
}

impl<'a, I, E> EventIteratorExt for I
where
    I: Iterator<Item = E>,
    E: Borrow<Event<'a>>,
{
    fn plain_text(self) -> String {
        let mut buffer = String::new();

        for event in self {
            match event.borrow() {
                Event::Text(text) | Event::Code(text) => buffer.push_str(text),
                Event::SoftBreak | Event::HardBreak => buffer.push(' '),
                _ => (),
            }
        }

        buffer.trim().to_string()
    }
}
