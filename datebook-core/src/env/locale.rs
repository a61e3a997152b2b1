//! Built-in locale tables.

/// Order of day, month and year in written dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    Mdy,
    Dmy,
    Ymd,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Locale {
    pub code: &'static str,
    pub month_names: [&'static str; 12],
    pub month_names_short: [&'static str; 12],
    /// Sunday first.
    pub weekday_names: [&'static str; 7],
    pub weekday_names_short: [&'static str; 7],
    pub weekday_names_narrow: [&'static str; 7],
    pub date_order: DateOrder,
    pub hour12: bool,
    pub meridiem: [&'static str; 2],
    /// First day of the week, 0 = Sunday.
    pub week_dow: u32,
    /// The January day that always falls in week one.
    pub week_doy: u32,
    pub week_text: &'static str,
    pub week_text_short: &'static str,
    /// Appended to numeric days in text dates (German "5.").
    pub day_suffix: &'static str,
    /// Placed between a day and a month or a month and a year ("5 de enero").
    pub month_joiner: &'static str,
    /// Comma after a leading weekday name.
    pub weekday_comma: bool,
    pub numeric_separator: &'static str,
    pub date_time_joiner: &'static str,
    pub range_separator: &'static str,
}

pub const EN: Locale = Locale {
    code: "en",
    month_names: [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ],
    month_names_short: [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ],
    weekday_names: [
        "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
    ],
    weekday_names_short: ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
    weekday_names_narrow: ["S", "M", "T", "W", "T", "F", "S"],
    date_order: DateOrder::Mdy,
    hour12: true,
    meridiem: ["AM", "PM"],
    week_dow: 0,
    week_doy: 6,
    week_text: "Week",
    week_text_short: "W",
    day_suffix: "",
    month_joiner: " ",
    weekday_comma: true,
    numeric_separator: "/",
    date_time_joiner: ", ",
    range_separator: " – ",
};

pub const EN_GB: Locale = Locale {
    code: "en-gb",
    date_order: DateOrder::Dmy,
    hour12: false,
    week_dow: 1,
    week_doy: 4,
    weekday_comma: false,
    ..EN
};

pub const DE: Locale = Locale {
    code: "de",
    month_names: [
        "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September",
        "Oktober", "November", "Dezember",
    ],
    month_names_short: [
        "Jan.", "Feb.", "März", "Apr.", "Mai", "Juni", "Juli", "Aug.", "Sept.", "Okt.", "Nov.",
        "Dez.",
    ],
    weekday_names: [
        "Sonntag", "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag",
    ],
    weekday_names_short: ["So.", "Mo.", "Di.", "Mi.", "Do.", "Fr.", "Sa."],
    weekday_names_narrow: ["S", "M", "D", "M", "D", "F", "S"],
    date_order: DateOrder::Dmy,
    hour12: false,
    meridiem: ["AM", "PM"],
    week_dow: 1,
    week_doy: 4,
    week_text: "KW",
    week_text_short: "KW",
    day_suffix: ".",
    month_joiner: " ",
    weekday_comma: true,
    numeric_separator: ".",
    date_time_joiner: ", ",
    range_separator: " – ",
};

pub const FR: Locale = Locale {
    code: "fr",
    month_names: [
        "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
        "octobre", "novembre", "décembre",
    ],
    month_names_short: [
        "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.",
        "nov.", "déc.",
    ],
    weekday_names: [
        "dimanche", "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi",
    ],
    weekday_names_short: ["dim.", "lun.", "mar.", "mer.", "jeu.", "ven.", "sam."],
    weekday_names_narrow: ["D", "L", "M", "M", "J", "V", "S"],
    date_order: DateOrder::Dmy,
    hour12: false,
    meridiem: ["AM", "PM"],
    week_dow: 1,
    week_doy: 4,
    week_text: "Sem.",
    week_text_short: "S",
    day_suffix: "",
    month_joiner: " ",
    weekday_comma: false,
    numeric_separator: "/",
    date_time_joiner: " ",
    range_separator: " – ",
};

pub const ES: Locale = Locale {
    code: "es",
    month_names: [
        "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
        "octubre", "noviembre", "diciembre",
    ],
    month_names_short: [
        "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
    ],
    weekday_names: [
        "domingo", "lunes", "martes", "miércoles", "jueves", "viernes", "sábado",
    ],
    weekday_names_short: ["dom", "lun", "mar", "mié", "jue", "vie", "sáb"],
    weekday_names_narrow: ["D", "L", "M", "X", "J", "V", "S"],
    date_order: DateOrder::Dmy,
    hour12: false,
    meridiem: ["a. m.", "p. m."],
    week_dow: 1,
    week_doy: 4,
    week_text: "Sm",
    week_text_short: "Sm",
    day_suffix: "",
    month_joiner: " de ",
    weekday_comma: true,
    numeric_separator: "/",
    date_time_joiner: ", ",
    range_separator: " – ",
};

static LOCALES: [&Locale; 5] = [&EN, &EN_GB, &DE, &FR, &ES];

/// Look up a locale by code, trying the language prefix (`de-AT` → `de`)
/// before falling back to `en`.
pub fn locale_for(code: &str) -> &'static Locale {
    let wanted = code.trim().to_ascii_lowercase().replace('_', "-");
    let exact = LOCALES.iter().find(|l| l.code == wanted);
    let by_language = || {
        let language = wanted.split('-').next().unwrap_or_default();
        LOCALES.iter().find(|l| l.code == language)
    };
    exact.or_else(by_language).copied().unwrap_or(&EN)
}

impl Locale {
    /// `month` is 1-based.
    pub fn month_name(&self, month: i64, short: bool) -> &'static str {
        let idx = (month - 1).rem_euclid(12) as usize;
        if short {
            self.month_names_short[idx]
        } else {
            self.month_names[idx]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_with_fallbacks() {
        assert_eq!(locale_for("de").code, "de");
        assert_eq!(locale_for("de-AT").code, "de");
        assert_eq!(locale_for("en_GB").code, "en-gb");
        assert_eq!(locale_for("en-US").code, "en");
        assert_eq!(locale_for("tlh").code, "en");
    }

    #[test]
    fn test_week_rules() {
        assert_eq!((EN.week_dow, EN.week_doy), (0, 6));
        assert_eq!((EN_GB.week_dow, EN_GB.week_doy), (1, 4));
        assert_eq!(EN_GB.month_names, EN.month_names);
    }
}
