use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use crate::parser::filters;

/// Stream object: header dictionary plus the raw (still encoded) body.
///
/// `Length` is kept direct and equal to the body length; the writer
/// relies on this.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dictionary: Dictionary,
    data: Vec<u8>,
}

impl Stream {
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_dictionary(Dictionary::new(), data)
    }

    pub fn with_dictionary(dictionary: Dictionary, data: Vec<u8>) -> Self {
        let mut dictionary = dictionary;
        dictionary.set("Length", data.len() as i64);
        Self { dictionary, data }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    /// Raw body bytes as stored in the file.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the raw body; filters in the dictionary are left alone.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.dictionary.set("Length", data.len() as i64);
        self.data = data;
    }

    pub fn is_filtered(&self) -> bool {
        self.dictionary.contains_key("Filter")
    }

    /// Body with every decodable filter applied.
    pub fn decoded(&self) -> Result<Vec<u8>> {
        Ok(filters::decode_stream(&self.data, &self.dictionary)?)
    }

    /// Stores `data` as the new decoded body, dropping previous filters.
    /// With `compress` the body is written through `FlateDecode`.
    pub fn set_decoded_data(&mut self, data: Vec<u8>, compress: bool) -> Result<()> {
        self.dictionary.remove("Filter");
        self.dictionary.remove("DecodeParms");
        self.dictionary.remove("DL");
        if compress {
            return self.compress_flate_from(data);
        }
        self.set_data(data);
        Ok(())
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.dictionary.set("Filter", Object::name(filter));
    }

    #[cfg(feature = "compression")]
    fn compress_flate_from(&mut self, data: Vec<u8>) -> Result<()> {
        let compressed =
            filters::encode_flate(&data).map_err(|e| PdfError::CompressionError(e.to_string()))?;
        self.set_data(compressed);
        self.set_filter("FlateDecode");
        Ok(())
    }

    #[cfg(not(feature = "compression"))]
    fn compress_flate_from(&mut self, _data: Vec<u8>) -> Result<()> {
        Err(PdfError::CompressionError(
            "FlateDecode requires 'compression' feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_new() {
        let stream = Stream::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(stream.data(), &[1, 2, 3, 4, 5]);
        assert_eq!(stream.dictionary().get("Length"), Some(&Object::Integer(5)));
    }

    #[test]
    fn test_length_overrides_dictionary() {
        let mut dict = Dictionary::new();
        dict.set("Length", 999);
        dict.set("Subtype", Object::name("Image"));
        let stream = Stream::with_dictionary(dict, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(3));
        assert_eq!(stream.dictionary().get_name("Subtype"), Some("Image"));
    }

    #[test]
    fn test_set_data_updates_length() {
        let mut stream = Stream::new(vec![1, 2, 3]);
        stream.set_data(vec![9; 10]);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(10));
    }

    #[test]
    fn test_decoded_without_filter() {
        let stream = Stream::new(b"0 0 m 10 10 l S".to_vec());
        assert_eq!(stream.decoded().unwrap(), b"0 0 m 10 10 l S");
    }

    #[test]
    fn test_set_decoded_data_plain_drops_filters() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("ASCIIHexDecode"));
        let mut stream = Stream::with_dictionary(dict, b"4142>".to_vec());
        assert_eq!(stream.decoded().unwrap(), b"AB");

        stream.set_decoded_data(b"XYZ".to_vec(), false).unwrap();
        assert!(!stream.is_filtered());
        assert_eq!(stream.data(), b"XYZ");
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_set_decoded_data_compressed() {
        let mut stream = Stream::new(Vec::new());
        let content = b"q 1 0 0 1 0 0 cm Q ".repeat(20);
        stream.set_decoded_data(content.clone(), true).unwrap();

        assert_eq!(stream.dictionary().get_name("Filter"), Some("FlateDecode"));
        assert!(stream.data().len() < content.len());
        assert_eq!(stream.decoded().unwrap(), content);
    }
}
