//! Month and weekday names per language
//!
//! Log headers are written in the language named by the `Lang:` metadata
//! field. Each table carries full names and abbreviations; matching is
//! case-insensitive, ignores a trailing `.` and folds common accents so
//! `lunedi` matches `lunedì`.

use chrono::Weekday;

/// Names used to read and write dates in one language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lang {
    code: &'static str,
    months: [&'static str; 12],
    months_abbr: [&'static str; 12],
    /// Monday first
    weekdays: [&'static str; 7],
    weekdays_abbr: [&'static str; 7],
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub const ENGLISH: Lang = Lang {
    code: "en",
    months: [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ],
    months_abbr: [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ],
    weekdays: [
        "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    ],
    weekdays_abbr: ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
};

pub const ITALIAN: Lang = Lang {
    code: "it",
    months: [
        "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto",
        "settembre", "ottobre", "novembre", "dicembre",
    ],
    months_abbr: [
        "gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic",
    ],
    weekdays: [
        "lunedì", "martedì", "mercoledì", "giovedì", "venerdì", "sabato", "domenica",
    ],
    weekdays_abbr: ["lun", "mar", "mer", "gio", "ven", "sab", "dom"],
};

pub const GERMAN: Lang = Lang {
    code: "de",
    months: [
        "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September",
        "Oktober", "November", "Dezember",
    ],
    months_abbr: [
        "Jan", "Feb", "Mär", "Apr", "Mai", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dez",
    ],
    weekdays: [
        "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag", "Sonntag",
    ],
    weekdays_abbr: ["Mo", "Di", "Mi", "Do", "Fr", "Sa", "So"],
};

pub const FRENCH: Lang = Lang {
    code: "fr",
    months: [
        "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
        "octobre", "novembre", "décembre",
    ],
    months_abbr: [
        "janv", "févr", "mars", "avr", "mai", "juin", "juil", "août", "sept", "oct", "nov", "déc",
    ],
    weekdays: [
        "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
    ],
    weekdays_abbr: ["lun", "mar", "mer", "jeu", "ven", "sam", "dim"],
};

pub const SPANISH: Lang = Lang {
    code: "es",
    months: [
        "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
        "octubre", "noviembre", "diciembre",
    ],
    months_abbr: [
        "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
    ],
    weekdays: [
        "lunes", "martes", "miércoles", "jueves", "viernes", "sábado", "domingo",
    ],
    weekdays_abbr: ["lun", "mar", "mié", "jue", "vie", "sáb", "dom"],
};

const ALL: [Lang; 5] = [ENGLISH, ITALIAN, GERMAN, FRENCH, SPANISH];

impl Default for Lang {
    fn default() -> Self {
        ENGLISH
    }
}

impl Lang {
    /// Looks up a language by code
    ///
    /// Accepts locale-style codes (`it_IT`, `it-IT`, `it_IT.UTF-8`).
    /// Returns `None` for unknown languages.
    pub fn from_code(code: &str) -> Option<Lang> {
        let base = code
            .trim()
            .split(['_', '-', '.', '@'])
            .next()
            .unwrap_or_default()
            .to_lowercase();

        ALL.iter().copied().find(|l| l.code == base)
    }

    /// Returns the language code
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Parses a month name or abbreviation, returning 1-12
    pub fn month(&self, word: &str) -> Option<u32> {
        let word = normalize(word);
        if word.is_empty() {
            return None;
        }

        self.months
            .iter()
            .zip(self.months_abbr.iter())
            .position(|(full, abbr)| normalize(full) == word || normalize(abbr) == word)
            .map(|idx| idx as u32 + 1)
    }

    /// Parses a weekday name or abbreviation
    pub fn weekday(&self, word: &str) -> Option<Weekday> {
        let word = normalize(word);
        if word.is_empty() {
            return None;
        }

        self.weekdays
            .iter()
            .zip(self.weekdays_abbr.iter())
            .position(|(full, abbr)| normalize(full) == word || normalize(abbr) == word)
            .map(|idx| WEEK[idx])
    }

    /// Full month name for 1-12
    pub fn month_name(&self, month: u32) -> &'static str {
        self.months[(month.clamp(1, 12) - 1) as usize]
    }

    /// Abbreviated month name for 1-12
    pub fn month_abbr(&self, month: u32) -> &'static str {
        self.months_abbr[(month.clamp(1, 12) - 1) as usize]
    }

    /// Full weekday name
    pub fn weekday_name(&self, weekday: Weekday) -> &'static str {
        self.weekdays[weekday.num_days_from_monday() as usize]
    }

    /// Abbreviated weekday name
    pub fn weekday_abbr(&self, weekday: Weekday) -> &'static str {
        self.weekdays_abbr[weekday.num_days_from_monday() as usize]
    }
}

/// Lowercases, strips a trailing dot and folds accents
fn normalize(word: &str) -> String {
    word.trim()
        .trim_end_matches('.')
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ä' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_months() {
        assert_eq!(ENGLISH.month("june"), Some(6));
        assert_eq!(ENGLISH.month("Jun"), Some(6));
        assert_eq!(ENGLISH.month("Sep."), Some(9));
        assert_eq!(ENGLISH.month("pippo"), None);
    }

    #[test]
    fn italian_months_and_weekdays() {
        assert_eq!(ITALIAN.month("marzo"), Some(3));
        assert_eq!(ITALIAN.weekday("lunedi"), Some(Weekday::Mon));
        assert_eq!(ITALIAN.weekday("Lunedì"), Some(Weekday::Mon));
        assert_eq!(ITALIAN.month("march"), None);
    }

    #[test]
    fn german_umlauts() {
        assert_eq!(GERMAN.month("März"), Some(3));
        assert_eq!(GERMAN.month("marz"), Some(3));
    }

    #[test]
    fn locale_style_codes() {
        assert_eq!(Lang::from_code("it_IT.UTF-8"), Some(ITALIAN));
        assert_eq!(Lang::from_code("de-DE"), Some(GERMAN));
        assert_eq!(Lang::from_code("FR"), Some(FRENCH));
        assert_eq!(Lang::from_code("xx"), None);
    }

    #[test]
    fn names() {
        assert_eq!(ENGLISH.month_name(3), "March");
        assert_eq!(ITALIAN.month_abbr(12), "dic");
        assert_eq!(SPANISH.weekday_name(Weekday::Wed), "miércoles");
        assert_eq!(ENGLISH.weekday_abbr(Weekday::Sun), "Sun");
    }
}
