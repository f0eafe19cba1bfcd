//! Random test data for scenarios.
//!
//! Each [`Generator`] owns its random source, so scenarios running side by
//! side never share or correlate their sequences. Seed it for repeatable
//! runs.

use std::fmt;

use chrono::{Duration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{ApiStepsError, Result};

/// Alphabet a random string is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Charset {
    AsciiLetters,
    Alphanumeric,
    Unicode,
    Polish,
    English,
    Russian,
    Japanese,
    Emoji,
}

const ENGLISH: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const POLISH: &str = "aąbcćdeęfghijklłmnńoóprsśtuwyzźżAĄBCĆDEĘFGHIJKLŁMNŃOÓPRSŚTUWYZŹŻ";
const RUSSIAN: &str = "абвгдеёжзийклмнопрстуфхцчшщъыьэюяАБВГДЕЁЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯ";
const JAPANESE: &str = "あいうえおかきくけこさしすせそたちつてとなにぬねのはひふへほまみむめもやゆよらりるれろわをんアイウエオカキクケコサシスセソタチツテトナニヌネノ";
const EMOJI: &str = "😀😃😄😁😆😅😂🤣😊😇🙂🙃😉😍🥰😘🚀🔥✨🎉👍👀🌍🍕⚽🎸";

impl Charset {
    pub fn alphabet(&self) -> Vec<char> {
        match self {
            Charset::AsciiLetters | Charset::English => ENGLISH.chars().collect(),
            Charset::Alphanumeric => ENGLISH.chars().chain(DIGITS.chars()).collect(),
            Charset::Polish => POLISH.chars().collect(),
            Charset::Russian => RUSSIAN.chars().collect(),
            Charset::Japanese => JAPANESE.chars().collect(),
            Charset::Emoji => EMOJI.chars().collect(),
            Charset::Unicode => [ENGLISH, DIGITS, POLISH, RUSSIAN, JAPANESE, EMOJI]
                .iter()
                .flat_map(|s| s.chars())
                .collect(),
        }
    }
}

/// Which way [`Generator::time_shifted`] moves from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimeDirection {
    Past,
    Future,
}

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do", "eiusmod",
    "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim", "ad", "minim",
    "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi", "aliquip", "ex", "ea",
    "commodo", "consequat",
];

pub struct Generator {
    rng: Box<dyn RngCore + Send + Sync>,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator").finish_non_exhaustive()
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

fn check_range<T: PartialOrd + fmt::Display>(what: &str, min: T, max: T) -> Result<()> {
    if min > max {
        return Err(ApiStepsError::InvalidArgument(format!(
            "{} range is empty: min {} is greater than max {}",
            what, min, max
        )));
    }
    Ok(())
}

impl Generator {
    pub fn new(rng: Box<dyn RngCore + Send + Sync>) -> Self {
        Self { rng }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(Box::new(StdRng::seed_from_u64(seed)))
    }

    pub fn from_entropy() -> Self {
        Self::new(Box::new(StdRng::from_entropy()))
    }

    /// Seeded when `seed` is set, random otherwise.
    pub fn from_settings(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }

    /// Inclusive on both ends.
    pub fn int_in_range(&mut self, min: i64, max: i64) -> Result<i64> {
        check_range("integer", min, max)?;
        Ok(self.rng.gen_range(min..=max))
    }

    pub fn float_in_range(&mut self, min: f64, max: f64) -> Result<f64> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ApiStepsError::InvalidArgument(format!("float range {}..{} is not finite", min, max)));
        }
        check_range("float", min, max)?;
        if !(max - min).is_finite() {
            return Err(ApiStepsError::InvalidArgument(format!("float range {}..{} is too wide", min, max)));
        }
        Ok(self.rng.gen_range(min..=max))
    }

    pub fn bool(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// A string of `min_len..=max_len` characters drawn from `charset`.
    pub fn string(&mut self, charset: Charset, min_len: usize, max_len: usize) -> Result<String> {
        check_range("string length", min_len, max_len)?;
        let alphabet = charset.alphabet();
        let len = self.rng.gen_range(min_len..=max_len);
        Ok((0..len).map(|_| alphabet[self.rng.gen_range(0..alphabet.len())]).collect())
    }

    /// Capitalised lorem-ipsum sentence ending in a full stop.
    pub fn sentence(&mut self, min_words: usize, max_words: usize) -> Result<String> {
        if min_words == 0 {
            return Err(ApiStepsError::InvalidArgument("a sentence needs at least one word".to_string()));
        }
        check_range("word count", min_words, max_words)?;
        let count = self.rng.gen_range(min_words..=max_words);
        let words: Vec<&str> = (0..count).map(|_| WORDS[self.rng.gen_range(0..WORDS.len())]).collect();
        let mut sentence = words.join(" ");
        if let Some(first) = sentence.get(..1) {
            let upper = first.to_uppercase();
            sentence.replace_range(..1, &upper);
        }
        sentence.push('.');
        Ok(sentence)
    }

    /// Now moved by `by` in `direction`, as RFC 3339 with second precision.
    pub fn time_shifted(&self, direction: TimeDirection, by: Duration) -> Result<String> {
        let now = Utc::now();
        let shifted = match direction {
            TimeDirection::Past => now.checked_sub_signed(by),
            TimeDirection::Future => now.checked_add_signed(by),
        };
        shifted
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .ok_or_else(|| ApiStepsError::InvalidArgument(format!("shifting now by {} overflows", by)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn seeded_generators_repeat_themselves() {
        let mut a = Generator::from_seed(42);
        let mut b = Generator::from_seed(42);
        for _ in 0..10 {
            assert_eq!(a.int_in_range(-5, 5).unwrap(), b.int_in_range(-5, 5).unwrap());
            assert_eq!(
                a.string(Charset::Alphanumeric, 3, 8).unwrap(),
                b.string(Charset::Alphanumeric, 3, 8).unwrap()
            );
        }
    }

    #[test]
    fn numbers_stay_in_range() {
        let mut g = Generator::from_seed(1);
        for _ in 0..100 {
            let i = g.int_in_range(3, 4).unwrap();
            assert!((3..=4).contains(&i));
            let f = g.float_in_range(-1.5, 1.5).unwrap();
            assert!((-1.5..=1.5).contains(&f));
        }
        assert_eq!(g.int_in_range(7, 7).unwrap(), 7);
        assert!(g.int_in_range(2, 1).is_err());
        assert!(g.float_in_range(0.0, f64::INFINITY).is_err());
        assert!(matches!(g.float_in_range(-f64::MAX, f64::MAX), Err(ApiStepsError::InvalidArgument(_))));
        assert!(g.float_in_range(0.0, f64::MAX).is_ok());
    }

    #[test]
    fn strings_use_the_charset() {
        let mut g = Generator::from_seed(9);
        for charset in Charset::iter() {
            let alphabet = charset.alphabet();
            let s = g.string(charset, 5, 10).unwrap();
            let n = s.chars().count();
            assert!((5..=10).contains(&n), "{} produced {} chars", charset, n);
            assert!(s.chars().all(|c| alphabet.contains(&c)));
        }
        assert_eq!(g.string(Charset::Emoji, 0, 0).unwrap(), "");
        assert!(g.string(Charset::Polish, 4, 2).is_err());
    }

    #[test]
    fn charset_names_parse() {
        assert_eq!(Charset::from_str("ascii_letters").unwrap(), Charset::AsciiLetters);
        assert_eq!(Charset::from_str("Russian").unwrap(), Charset::Russian);
        assert_eq!(TimeDirection::from_str("FUTURE").unwrap(), TimeDirection::Future);
    }

    #[test]
    fn sentences() {
        let mut g = Generator::from_seed(3);
        let s = g.sentence(2, 4).unwrap();
        assert!(s.ends_with('.'));
        assert!(s.chars().next().unwrap().is_uppercase());
        let words = s.trim_end_matches('.').split(' ').count();
        assert!((2..=4).contains(&words));
        assert!(g.sentence(0, 3).is_err());
    }

    #[test]
    fn shifted_time_is_rfc3339_on_the_right_side_of_now() {
        let g = Generator::from_seed(0);
        let past = g.time_shifted(TimeDirection::Past, Duration::hours(1)).unwrap();
        let future = g.time_shifted(TimeDirection::Future, Duration::hours(1)).unwrap();
        let past = chrono::DateTime::parse_from_rfc3339(&past).unwrap();
        let future = chrono::DateTime::parse_from_rfc3339(&future).unwrap();
        assert!(past < Utc::now());
        assert!(future > Utc::now());
    }
}
