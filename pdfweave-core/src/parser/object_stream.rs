//! PDF Object Stream Parser
//!
//! Handles compressed objects stored in object streams (PDF 1.5+).

use super::filters::decode_stream;
use super::lexer::{Lexer, Token};
use super::objects::ObjectParser;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Object, ObjectId, Stream};

/// Decoded object stream with its `(object number, offset)` table.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    data: Vec<u8>,
    first: usize,
    offsets: Vec<(u32, usize)>,
    extends: Option<ObjectId>,
}

impl ObjectStream {
    /// Decodes `stream` and reads its header table.
    pub fn parse(stream: &Stream) -> ParseResult<Self> {
        let dict = stream.dictionary();
        if dict.get_type() != Some("ObjStm") {
            tracing::warn!("object stream without /Type /ObjStm");
        }
        let n = dict
            .get_integer("N")
            .filter(|&n| n >= 0)
            .ok_or_else(|| ParseError::MissingKey("N".to_string()))? as usize;
        let first = dict
            .get_integer("First")
            .filter(|&f| f >= 0)
            .ok_or_else(|| ParseError::MissingKey("First".to_string()))? as usize;
        let extends = dict.get_reference("Extends");

        let data = decode_stream(stream.data(), dict)?;
        let mut lexer = Lexer::new(&data);
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let position = lexer.position();
            match (lexer.next_token()?, lexer.next_token()?) {
                (Token::Integer(number), Token::Integer(offset)) if number >= 0 && offset >= 0 => {
                    offsets.push((number as u32, offset as usize));
                }
                _ => {
                    return Err(ParseError::syntax(
                        position,
                        "Expected object number and offset in object stream",
                    ))
                }
            }
        }

        Ok(Self {
            data,
            first,
            offsets,
            extends,
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Base stream named by `/Extends`.
    pub fn extends(&self) -> Option<ObjectId> {
        self.extends
    }

    /// Object numbers stored in this stream, in table order.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.offsets.iter().map(|(number, _)| *number)
    }

    /// Parses the object for `number`, trying the table slot `index` first.
    pub fn get(&self, number: u32, index: usize, options: &ParseOptions) -> ParseResult<Option<Object>> {
        let slot = match self.offsets.get(index) {
            Some((n, offset)) if *n == number => Some(*offset),
            _ => self
                .offsets
                .iter()
                .find(|(n, _)| *n == number)
                .map(|(_, offset)| *offset),
        };
        let Some(offset) = slot else {
            return Ok(None);
        };
        let start = self.first + offset;
        if start > self.data.len() {
            return Err(ParseError::corrupt(start, "object stream offset past end of data"));
        }
        let mut parser = ObjectParser::new(&self.data, start, options);
        parser.parse_object().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Dictionary;

    fn object_stream(header: &str, body: &str) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("ObjStm"));
        dict.set("N", 2);
        dict.set("First", header.len() as i64);
        Stream::with_dictionary(dict, format!("{header}{body}").into_bytes())
    }

    #[test]
    fn test_parse_object_stream() {
        let stream = object_stream("10 0 11 14 ", "<< /A 1 >>    [1 2 0 R]");
        let objstm = ObjectStream::parse(&stream).unwrap();
        let options = ParseOptions::default();

        assert_eq!(objstm.len(), 2);
        assert_eq!(objstm.object_numbers().collect::<Vec<_>>(), [10, 11]);
        let first = objstm.get(10, 0, &options).unwrap().unwrap();
        assert_eq!(first.as_dict().unwrap().get_integer("A"), Some(1));
        let second = objstm.get(11, 1, &options).unwrap().unwrap();
        assert_eq!(
            second,
            Object::Array(vec![Object::Integer(1), Object::Reference(ObjectId::new(2, 0))])
        );
    }

    #[test]
    fn test_wrong_index_falls_back_to_search() {
        let stream = object_stream("10 0 11 14 ", "<< /A 1 >>    42");
        let objstm = ObjectStream::parse(&stream).unwrap();
        let options = ParseOptions::default();
        assert_eq!(objstm.get(11, 0, &options).unwrap(), Some(Object::Integer(42)));
        assert_eq!(objstm.get(99, 0, &options).unwrap(), None);
    }

    #[test]
    fn test_missing_first_is_error() {
        let mut dict = Dictionary::new();
        dict.set("N", 0);
        let stream = Stream::with_dictionary(dict, Vec::new());
        assert!(matches!(
            ObjectStream::parse(&stream),
            Err(ParseError::MissingKey(key)) if key == "First"
        ));
    }
}
