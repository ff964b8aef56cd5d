use tally_core::Locale;

/// Per-locale vocabulary for the local extractor.
///
/// Word lists are lower-case. Month entries map every accepted spelling
/// (full, genitive, abbreviated) to its month number.
#[derive(Debug)]
pub struct LocaleRules {
    pub locale: Locale,
    pub today: &'static [&'static str],
    pub yesterday: &'static [&'static str],
    pub day_before_yesterday: &'static [&'static str],
    pub months: &'static [(&'static str, u32)],
    /// Thousands separators accepted inside grouped numbers
    pub group_separators: &'static [char],
    /// `MM/DD` instead of `DD/MM`
    pub month_first: bool,
    /// Accept `DD.MM` without a year (only where `.` is not the decimal point)
    pub short_dotted_dates: bool,
    pub currency_words: &'static [(&'static str, &'static str)],
    /// Matched as word prefixes so inflected forms count
    pub income_words: &'static [&'static str],
    /// Stripped from both ends of a title
    pub filler: &'static [&'static str],
}

/// Symbols and ISO codes understood in every locale
pub const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("₽", "RUB"),
    ("₴", "UAH"),
];

pub const CURRENCY_CODES: &[(&str, &str)] = &[
    ("usd", "USD"),
    ("eur", "EUR"),
    ("gbp", "GBP"),
    ("rub", "RUB"),
    ("uah", "UAH"),
];

static EN: LocaleRules = LocaleRules {
    locale: Locale::En,
    today: &["today"],
    yesterday: &["yesterday"],
    day_before_yesterday: &["day before yesterday"],
    months: &[
        ("january", 1), ("jan", 1),
        ("february", 2), ("feb", 2),
        ("march", 3), ("mar", 3),
        ("april", 4), ("apr", 4),
        ("may", 5),
        ("june", 6), ("jun", 6),
        ("july", 7), ("jul", 7),
        ("august", 8), ("aug", 8),
        ("september", 9), ("sept", 9), ("sep", 9),
        ("october", 10), ("oct", 10),
        ("november", 11), ("nov", 11),
        ("december", 12), ("dec", 12),
    ],
    group_separators: &[','],
    month_first: true,
    short_dotted_dates: false,
    currency_words: &[
        ("dollars", "USD"), ("dollar", "USD"), ("bucks", "USD"), ("buck", "USD"),
        ("euros", "EUR"), ("euro", "EUR"),
        ("pounds", "GBP"), ("pound", "GBP"),
        ("rubles", "RUB"), ("ruble", "RUB"),
        ("hryvnias", "UAH"), ("hryvnia", "UAH"),
    ],
    income_words: &["salary", "income", "paycheck", "payday", "earned", "received", "bonus", "refund"],
    filler: &[
        "i", "spent", "spend", "paid", "pay", "bought", "buy", "got", "on", "for", "at", "in",
        "to", "the", "a", "an", "my", "of", "and", "from",
    ],
};

static RU: LocaleRules = LocaleRules {
    locale: Locale::Ru,
    today: &["сегодня"],
    yesterday: &["вчера"],
    day_before_yesterday: &["позавчера"],
    months: &[
        ("январь", 1), ("января", 1), ("янв", 1),
        ("февраль", 2), ("февраля", 2), ("фев", 2),
        ("март", 3), ("марта", 3), ("мар", 3),
        ("апрель", 4), ("апреля", 4), ("апр", 4),
        ("май", 5), ("мая", 5),
        ("июнь", 6), ("июня", 6), ("июн", 6),
        ("июль", 7), ("июля", 7), ("июл", 7),
        ("август", 8), ("августа", 8), ("авг", 8),
        ("сентябрь", 9), ("сентября", 9), ("сент", 9), ("сен", 9),
        ("октябрь", 10), ("октября", 10), ("окт", 10),
        ("ноябрь", 11), ("ноября", 11), ("ноя", 11),
        ("декабрь", 12), ("декабря", 12), ("дек", 12),
    ],
    group_separators: &[' ', '\u{a0}'],
    month_first: false,
    short_dotted_dates: true,
    currency_words: &[
        ("рублей", "RUB"), ("рубля", "RUB"), ("рубль", "RUB"), ("руб", "RUB"),
        ("долларов", "USD"), ("доллара", "USD"), ("доллар", "USD"), ("баксов", "USD"),
        ("евро", "EUR"),
        ("гривен", "UAH"), ("гривны", "UAH"), ("гривна", "UAH"), ("грн", "UAH"),
    ],
    income_words: &["зарплат", "зп", "доход", "получил", "премия", "премию", "аванс"],
    filler: &[
        "я", "на", "за", "в", "во", "и", "потратил", "потратила", "купил", "купила",
        "заплатил", "заплатила", "оплатил", "оплатила",
    ],
};

static UK: LocaleRules = LocaleRules {
    locale: Locale::Uk,
    today: &["сьогодні"],
    yesterday: &["вчора", "учора"],
    day_before_yesterday: &["позавчора"],
    months: &[
        ("січень", 1), ("січня", 1), ("січ", 1),
        ("лютий", 2), ("лютого", 2), ("лют", 2),
        ("березень", 3), ("березня", 3), ("бер", 3),
        ("квітень", 4), ("квітня", 4), ("квіт", 4),
        ("травень", 5), ("травня", 5), ("трав", 5),
        ("червень", 6), ("червня", 6), ("черв", 6),
        ("липень", 7), ("липня", 7), ("лип", 7),
        ("серпень", 8), ("серпня", 8), ("серп", 8),
        ("вересень", 9), ("вересня", 9), ("вер", 9),
        ("жовтень", 10), ("жовтня", 10), ("жовт", 10),
        ("листопад", 11), ("листопада", 11), ("лист", 11),
        ("грудень", 12), ("грудня", 12), ("груд", 12),
    ],
    group_separators: &[' ', '\u{a0}'],
    month_first: false,
    short_dotted_dates: true,
    currency_words: &[
        ("гривень", "UAH"), ("гривні", "UAH"), ("гривня", "UAH"), ("грн", "UAH"),
        ("доларів", "USD"), ("долара", "USD"), ("долар", "USD"),
        ("євро", "EUR"),
        ("рублів", "RUB"),
    ],
    income_words: &["зарплат", "зп", "дохід", "отримав", "отримала", "премія", "премію", "аванс"],
    filler: &[
        "я", "на", "за", "в", "у", "і", "й", "витратив", "витратила", "купив", "купила",
        "заплатив", "заплатила", "сплатив", "сплатила",
    ],
};

static DE: LocaleRules = LocaleRules {
    locale: Locale::De,
    today: &["heute"],
    yesterday: &["gestern"],
    day_before_yesterday: &["vorgestern"],
    months: &[
        ("januar", 1), ("jänner", 1), ("jan", 1),
        ("februar", 2), ("feb", 2),
        ("märz", 3), ("maerz", 3), ("mär", 3),
        ("april", 4), ("apr", 4),
        ("mai", 5),
        ("juni", 6), ("jun", 6),
        ("juli", 7), ("jul", 7),
        ("august", 8), ("aug", 8),
        ("september", 9), ("sept", 9), ("sep", 9),
        ("oktober", 10), ("okt", 10),
        ("november", 11), ("nov", 11),
        ("dezember", 12), ("dez", 12),
    ],
    group_separators: &['.'],
    month_first: false,
    short_dotted_dates: true,
    currency_words: &[("euro", "EUR"), ("dollar", "USD"), ("pfund", "GBP")],
    income_words: &["gehalt", "lohn", "einkommen", "einnahme", "bonus", "erstattung"],
    filler: &[
        "ich", "habe", "hab", "für", "fur", "auf", "im", "in", "am", "beim", "bei", "und",
        "bezahlt", "gezahlt", "gekauft", "ausgegeben", "der", "die", "das",
    ],
};

static ES: LocaleRules = LocaleRules {
    locale: Locale::Es,
    today: &["hoy"],
    yesterday: &["ayer"],
    day_before_yesterday: &["antes de ayer", "anteayer", "antier"],
    months: &[
        ("enero", 1), ("ene", 1),
        ("febrero", 2), ("feb", 2),
        ("marzo", 3), ("mar", 3),
        ("abril", 4), ("abr", 4),
        ("mayo", 5),
        ("junio", 6), ("jun", 6),
        ("julio", 7), ("jul", 7),
        ("agosto", 8), ("ago", 8),
        ("septiembre", 9), ("setiembre", 9), ("sept", 9), ("sep", 9),
        ("octubre", 10), ("oct", 10),
        ("noviembre", 11), ("nov", 11),
        ("diciembre", 12), ("dic", 12),
    ],
    group_separators: &['.'],
    month_first: false,
    short_dotted_dates: true,
    currency_words: &[
        ("euros", "EUR"), ("euro", "EUR"),
        ("dólares", "USD"), ("dolares", "USD"), ("dólar", "USD"), ("dolar", "USD"),
        ("libras", "GBP"),
    ],
    income_words: &["sueldo", "salario", "nómina", "nomina", "ingreso", "cobré", "cobre", "reembolso"],
    filler: &[
        "gasté", "gaste", "pagué", "pague", "compré", "compre", "en", "de", "por", "para",
        "el", "la", "los", "las", "un", "una", "y", "mi",
    ],
};

pub fn rules(locale: Locale) -> &'static LocaleRules {
    match locale {
        Locale::En => &EN,
        Locale::Ru => &RU,
        Locale::Uk => &UK,
        Locale::De => &DE,
        Locale::Es => &ES,
    }
}

impl LocaleRules {
    pub fn month(&self, word: &str) -> Option<u32> {
        let word = word.to_lowercase();
        self.months
            .iter()
            .find(|(name, _)| *name == word)
            .map(|(_, m)| *m)
    }

    /// ISO code for a currency symbol, code or locale word
    pub fn currency(&self, token: &str) -> Option<&'static str> {
        let token = token.to_lowercase();
        CURRENCY_SYMBOLS
            .iter()
            .chain(CURRENCY_CODES)
            .chain(self.currency_words)
            .find(|(word, _)| *word == token)
            .map(|(_, code)| *code)
    }

    pub fn is_filler(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.filler.contains(&token.as_str()) || self.currency(&token).is_some()
    }

    pub fn is_income_word(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.income_words.iter().any(|w| token.starts_with(w))
    }
}
