// The settings contract is an INI-style document (sections of Key = Value
// lines), the format the upstream beamline tooling reads and writes. The
// codec here is deliberately small: ordered sections, `#` and `;` comments,
// whitespace-insensitive keys. Values are kept as raw strings; typing is the
// settings layer's job.
use super::error::IniError;

/// One `[Section]` of an INI document with its key/value pairs in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniSection {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a key. Replacement keeps the original position so
    /// serialization stays stable.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// An ordered INI document.
///
/// Parsing and re-serializing a document yields the same section/key/value
/// mapping; the converter relies on this when it copies the effective
/// settings into the output directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Result<Self, IniError> {
        let mut doc = IniDocument::default();
        for (idx, raw_line) in text.lines().enumerate() {
            let line_number = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| IniError::UnterminatedSection(line_number, line.to_string()))?;
                doc.sections.push(IniSection::new(name.trim()));
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| IniError::BadLine(line_number, line.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(IniError::BadLine(line_number, line.to_string()));
            }
            let section = doc
                .sections
                .last_mut()
                .ok_or(IniError::KeyOutsideSection(line_number))?;
            section.set(key, value.trim());
        }
        Ok(doc)
    }

    pub fn read_file(path: &std::path::Path) -> Result<Self, IniError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Get a section, creating it at the tail if absent.
    pub fn section_mut(&mut self, name: &str) -> &mut IniSection {
        if let Some(pos) = self.sections.iter().position(|s| s.name == name) {
            &mut self.sections[pos]
        } else {
            self.sections.push(IniSection::new(name));
            self.sections.last_mut().unwrap()
        }
    }

    pub fn sections(&self) -> &[IniSection] {
        &self.sections
    }
}

impl std::fmt::Display for IniDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, section) in self.sections.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in section.entries() {
                writeln!(f, "{} = {}", key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
# smalldata conversion settings
[Diffraction]
FileType = LCLS_XPP
CropExtentX = 512

; positions come from the same file
[ProbePositions]
FileType = LCLS_XPP
";

    #[test]
    fn test_parse_sections_and_keys() {
        let doc = IniDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.sections().len(), 2);
        assert_eq!(doc.get("Diffraction", "FileType"), Some("LCLS_XPP"));
        assert_eq!(doc.get("Diffraction", "CropExtentX"), Some("512"));
        assert_eq!(doc.get("ProbePositions", "FileType"), Some("LCLS_XPP"));
        assert_eq!(doc.get("Diffraction", "Missing"), None);
        assert_eq!(doc.get("Missing", "FileType"), None);
    }

    #[test]
    fn test_round_trip_stable() {
        let doc = IniDocument::parse(SAMPLE).unwrap();
        let serialized = doc.to_string();
        let reparsed = IniDocument::parse(&serialized).unwrap();
        assert_eq!(doc, reparsed);
        assert_eq!(serialized, reparsed.to_string());
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let doc = IniDocument::parse("[A]\nKey = 1\nKey = 2\n").unwrap();
        assert_eq!(doc.get("A", "Key"), Some("2"));
        assert_eq!(doc.section("A").unwrap().entries().len(), 1);
    }

    #[test]
    fn test_bad_line_rejected() {
        match IniDocument::parse("[A]\nnot an assignment\n") {
            Err(IniError::BadLine(2, _)) => (),
            other => panic!("expected BadLine, got {other:?}"),
        }
    }

    #[test]
    fn test_key_outside_section_rejected() {
        match IniDocument::parse("Key = 1\n") {
            Err(IniError::KeyOutsideSection(1)) => (),
            other => panic!("expected KeyOutsideSection, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_section_rejected() {
        match IniDocument::parse("[A\n") {
            Err(IniError::UnterminatedSection(1, _)) => (),
            other => panic!("expected UnterminatedSection, got {other:?}"),
        }
    }

    #[test]
    fn test_set_preserves_position() {
        let mut doc = IniDocument::parse("[A]\nFirst = 1\nSecond = 2\n").unwrap();
        doc.section_mut("A").set("First", "10");
        let entries = doc.section("A").unwrap().entries();
        assert_eq!(entries[0], ("First".to_string(), "10".to_string()));
        assert_eq!(entries[1], ("Second".to_string(), "2".to_string()));
    }
}
