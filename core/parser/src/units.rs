//! FILENAME: core/parser/src/units.rs
//! PURPOSE: Read-only registry of currency symbols, currency codes, and
//! measurement units.
//! CONTEXT: The lexer consults this registry when a number is followed by a
//! word, and the parser uses it to canonicalize conversion targets. The
//! evaluator reads the dimension and factor of each unit to convert between
//! units of the same dimension.
//!
//! All tables are built once on first use and never mutated.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Physical category of a measurement unit. Units convert only within one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    Length,
    Mass,
    Volume,
    Data,
    Pressure,
    Energy,
    Power,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dimension::Length => "length",
            Dimension::Mass => "mass",
            Dimension::Volume => "volume",
            Dimension::Data => "data",
            Dimension::Pressure => "pressure",
            Dimension::Energy => "energy",
            Dimension::Power => "power",
        };
        write!(f, "{}", name)
    }
}

/// A registered measurement unit. `factor` is the number of base units
/// (m, g, L, B, Pa, J, W) in one of this unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDefinition {
    pub canonical: &'static str,
    pub dimension: Dimension,
    pub factor: Decimal,
}

/// What a string denotes when it appears next to a number.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitClass {
    /// `$ € £ ¥`, with the code it maps to.
    CurrencySymbol(&'static str),
    /// Exactly three uppercase ASCII letters.
    CurrencyCode,
    Measurement(&'static UnitDefinition),
    /// A registered two-word unit such as `nautical miles`.
    MultiWord(&'static UnitDefinition),
    /// Any other word that is syntactically usable as a unit (`apples`).
    UserDefined,
    Invalid,
}

struct UnitSpec {
    canonical: &'static str,
    dimension: Dimension,
    mantissa: i64,
    scale: u32,
    /// Case-sensitive spellings.
    symbols: &'static [&'static str],
    /// Case-insensitive spellings.
    words: &'static [&'static str],
}

const fn unit(
    canonical: &'static str,
    dimension: Dimension,
    mantissa: i64,
    scale: u32,
    symbols: &'static [&'static str],
    words: &'static [&'static str],
) -> UnitSpec {
    UnitSpec {
        canonical,
        dimension,
        mantissa,
        scale,
        symbols,
        words,
    }
}

use Dimension::*;

const UNIT_SPECS: &[UnitSpec] = &[
    // Length (base: meter)
    unit("m", Length, 1, 0, &["m"], &["meter", "meters", "metre", "metres"]),
    unit("cm", Length, 1, 2, &["cm"], &["centimeter", "centimeters", "centimetre", "centimetres"]),
    unit("mm", Length, 1, 3, &["mm"], &["millimeter", "millimeters", "millimetre", "millimetres"]),
    unit("km", Length, 1000, 0, &["km"], &["kilometer", "kilometers", "kilometre", "kilometres"]),
    unit("inch", Length, 254, 4, &[], &["inch", "inches"]),
    unit("ft", Length, 3048, 4, &["ft"], &["foot", "feet"]),
    unit("yd", Length, 9144, 4, &["yd"], &["yard", "yards"]),
    unit("mi", Length, 1_609_344, 3, &["mi"], &["mile", "miles"]),
    unit("nautical mile", Length, 1852, 0, &["nmi", "NM"], &["nautical mile", "nautical miles"]),
    unit("light year", Length, 9_460_730_472_580_800, 0, &["ly"], &["light year", "light years"]),
    // Mass (base: gram)
    unit("g", Mass, 1, 0, &["g"], &["gram", "grams"]),
    unit("mg", Mass, 1, 3, &["mg"], &["milligram", "milligrams"]),
    unit("kg", Mass, 1000, 0, &["kg"], &["kilogram", "kilograms", "kilo", "kilos"]),
    unit("tonne", Mass, 1_000_000, 0, &[], &["tonne", "tonnes"]),
    unit("lb", Mass, 45_359_237, 5, &["lb", "lbs"], &["pound", "pounds"]),
    unit("oz", Mass, 28_349_523_125, 9, &["oz"], &["ounce", "ounces"]),
    // Volume (base: liter)
    unit("L", Volume, 1, 0, &["L", "l"], &["liter", "liters", "litre", "litres"]),
    unit("mL", Volume, 1, 3, &["mL", "ml"], &["milliliter", "milliliters", "millilitre", "millilitres"]),
    unit("gal", Volume, 3_785_411_784, 9, &["gal"], &["gallon", "gallons"]),
    unit("cup", Volume, 2_365_882_365, 10, &[], &["cup", "cups"]),
    unit("fl oz", Volume, 295_735_295_625, 13, &["floz"], &["fluid ounce", "fluid ounces"]),
    // Data (base: byte)
    unit("bit", Data, 125, 3, &["b"], &["bit", "bits"]),
    unit("B", Data, 1, 0, &["B"], &["byte", "bytes"]),
    unit("KB", Data, 1_000, 0, &["KB", "kB"], &["kilobyte", "kilobytes"]),
    unit("MB", Data, 1_000_000, 0, &["MB"], &["megabyte", "megabytes"]),
    unit("GB", Data, 1_000_000_000, 0, &["GB"], &["gigabyte", "gigabytes"]),
    unit("TB", Data, 1_000_000_000_000, 0, &["TB"], &["terabyte", "terabytes"]),
    unit("PB", Data, 1_000_000_000_000_000, 0, &["PB"], &["petabyte", "petabytes"]),
    unit("KiB", Data, 1_024, 0, &["KiB"], &["kibibyte", "kibibytes"]),
    unit("MiB", Data, 1_048_576, 0, &["MiB"], &["mebibyte", "mebibytes"]),
    unit("GiB", Data, 1_073_741_824, 0, &["GiB"], &["gibibyte", "gibibytes"]),
    unit("TiB", Data, 1_099_511_627_776, 0, &["TiB"], &["tebibyte", "tebibytes"]),
    // Pressure (base: pascal)
    unit("Pa", Pressure, 1, 0, &["Pa"], &["pascal", "pascals"]),
    unit("kPa", Pressure, 1_000, 0, &["kPa"], &["kilopascal", "kilopascals"]),
    unit("MPa", Pressure, 1_000_000, 0, &["MPa"], &["megapascal", "megapascals"]),
    unit("bar", Pressure, 100_000, 0, &["bar"], &["bars"]),
    unit("psi", Pressure, 6_894_757_293_168, 9, &["psi"], &[]),
    unit("atm", Pressure, 101_325, 0, &["atm"], &["atmosphere", "atmospheres"]),
    // Energy (base: joule)
    unit("J", Energy, 1, 0, &["J"], &["joule", "joules"]),
    unit("kJ", Energy, 1_000, 0, &["kJ"], &["kilojoule", "kilojoules"]),
    unit("cal", Energy, 4_184, 3, &["cal"], &["calorie", "calories"]),
    unit("kcal", Energy, 4_184, 0, &["kcal"], &["kilocalorie", "kilocalories"]),
    unit("Wh", Energy, 3_600, 0, &["Wh"], &[]),
    unit("kWh", Energy, 3_600_000, 0, &["kWh"], &[]),
    // Power (base: watt)
    unit("W", Power, 1, 0, &["W"], &["watt", "watts"]),
    unit("kW", Power, 1_000, 0, &["kW"], &["kilowatt", "kilowatts"]),
    unit("MW", Power, 1_000_000, 0, &["MW"], &["megawatt", "megawatts"]),
    unit("hp", Power, 74_569_987_158_227_022, 14, &["hp"], &["horsepower"]),
];

/// Two-word units, keyed on the first word. Only these pairs ever fuse.
const MULTI_WORD_UNITS: &[(&str, &str, &str)] = &[
    ("nautical", "mile", "nautical mile"),
    ("nautical", "miles", "nautical mile"),
    ("fluid", "ounce", "fl oz"),
    ("fluid", "ounces", "fl oz"),
    ("light", "year", "light year"),
    ("light", "years", "light year"),
];

const CURRENCY_SYMBOLS: &[(char, &str)] = &[('$', "USD"), ('€', "EUR"), ('£', "GBP"), ('¥', "JPY")];

/// Words that keep their grammatical meaning after a number and never become units.
const RESERVED_WORDS: &[&str] = &[
    "in", "per", "over", "at", "with", "and", "as", "of", "downtime", "buffer", "napkin", "true",
    "false", "yes", "no", "today", "tomorrow", "yesterday", "now", "am", "pm",
];

struct Registry {
    definitions: FxHashMap<&'static str, UnitDefinition>,
    symbols: FxHashMap<&'static str, &'static str>,
    words: FxHashMap<String, &'static str>,
    multi_word: FxHashMap<&'static str, Vec<(&'static str, &'static str)>>,
}

impl Registry {
    fn build() -> Self {
        let mut definitions = FxHashMap::default();
        let mut symbols = FxHashMap::default();
        let mut words = FxHashMap::default();

        for spec in UNIT_SPECS {
            definitions.insert(
                spec.canonical,
                UnitDefinition {
                    canonical: spec.canonical,
                    dimension: spec.dimension,
                    factor: Decimal::new(spec.mantissa, spec.scale),
                },
            );
            symbols.insert(spec.canonical, spec.canonical);
            for symbol in spec.symbols {
                symbols.insert(*symbol, spec.canonical);
            }
            for word in spec.words {
                words.insert(word.to_ascii_lowercase(), spec.canonical);
            }
        }

        let mut multi_word: FxHashMap<&'static str, Vec<(&'static str, &'static str)>> =
            FxHashMap::default();
        for (first, second, canonical) in MULTI_WORD_UNITS {
            multi_word.entry(*first).or_default().push((*second, *canonical));
        }

        Registry {
            definitions,
            symbols,
            words,
            multi_word,
        }
    }

    fn lookup(&self, s: &str) -> Option<&UnitDefinition> {
        let canonical = self
            .symbols
            .get(s)
            .copied()
            .or_else(|| self.words.get(&s.to_ascii_lowercase()).copied())?;
        self.definitions.get(canonical)
    }
}

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::build);

/// True for registered measurement units and their aliases, including
/// two-word units written with a single space.
pub fn is_valid_unit(s: &str) -> bool {
    REGISTRY.lookup(s).is_some()
}

/// True only for the four prefix currency symbols.
pub fn is_prefix(s: &str) -> bool {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => currency_code_for_symbol(c).is_some(),
        _ => false,
    }
}

/// True for anything that may follow a number after one space: a currency
/// code or a registered unit.
pub fn is_suffix(s: &str) -> bool {
    is_currency_code(s) || is_valid_unit(s)
}

/// Resolves aliases to the canonical unit name. Unknown units come back unchanged.
pub fn canonicalize(s: &str) -> String {
    match REGISTRY.lookup(s) {
        Some(def) => def.canonical.to_string(),
        None => s.to_string(),
    }
}

pub fn unit_definition(s: &str) -> Option<&'static UnitDefinition> {
    REGISTRY.lookup(s)
}

/// Second-word lookahead for two-word units. Returns the canonical unit
/// when `first second` is a registered pair.
pub fn multi_word_unit(first: &str, second: &str) -> Option<&'static str> {
    let first = first.to_ascii_lowercase();
    let second = second.to_ascii_lowercase();
    REGISTRY
        .multi_word
        .get(first.as_str())?
        .iter()
        .find(|(candidate, _)| *candidate == second)
        .map(|(_, canonical)| *canonical)
}

/// Structural check only: exactly three uppercase ASCII letters.
/// Not validated against the ISO 4217 list.
pub fn is_currency_code(s: &str) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_uppercase())
}

pub fn currency_code_for_symbol(symbol: char) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| *c == symbol)
        .map(|(_, code)| *code)
}

pub fn currency_symbol_for_code(code: &str) -> Option<char> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(symbol, _)| *symbol)
}

pub fn is_reserved_word(s: &str) -> bool {
    RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(s))
}

/// A word usable as an arbitrary user-defined unit: starts with a letter,
/// continues with letters, digits or underscores, and is not reserved.
pub fn is_user_unit(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_') && !is_reserved_word(s)
}

pub fn classify(s: &str) -> UnitClass {
    if is_prefix(s) {
        let symbol = s.chars().next().and_then(currency_code_for_symbol);
        if let Some(code) = symbol {
            return UnitClass::CurrencySymbol(code);
        }
    }
    if is_currency_code(s) {
        return UnitClass::CurrencyCode;
    }
    if let Some(def) = REGISTRY.lookup(s) {
        return if s.contains(' ') {
            UnitClass::MultiWord(def)
        } else {
            UnitClass::Measurement(def)
        };
    }
    if let Some((first, second)) = s.split_once(' ') {
        if let Some(def) = multi_word_unit(first, second).and_then(|c| REGISTRY.lookup(c)) {
            return UnitClass::MultiWord(def);
        }
    }
    if is_user_unit(s) {
        UnitClass::UserDefined
    } else {
        UnitClass::Invalid
    }
}
