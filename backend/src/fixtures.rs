//! Test fixtures: trimmed copies of the five yearly releases, using the
//! real header layouts of each year.

use std::path::Path;

use crate::parser::{parse_str, RawTable};

pub const YEAR_2015: &str = "\
Country,Region,Happiness Rank,Happiness Score,Standard Error,Economy (GDP per Capita),Family,Health (Life Expectancy),Freedom,Trust (Government Corruption),Generosity,Dystopia Residual
Switzerland,Western Europe,1,7.587,0.03411,1.39651,1.34951,0.94143,0.66557,0.41978,0.29678,2.51738
Canada,North America,5,7.427,0.03553,1.32629,1.32261,0.90563,0.63297,0.32957,0.45811,2.45176
Hong Kong,Eastern Asia,72,5.474,0.05051,1.38604,1.05818,1.01328,0.59608,0.37124,0.39478,0.65429
Somaliland region,Sub-Saharan Africa,91,5.057,0.06161,0.18847,0.95152,0.43873,0.46582,0.39928,0.50318,2.11032
";

pub const YEAR_2016: &str = "\
Country,Region,Happiness Rank,Happiness Score,Lower Confidence Interval,Upper Confidence Interval,Economy (GDP per Capita),Family,Health (Life Expectancy),Freedom,Trust (Government Corruption),Generosity,Dystopia Residual
Denmark,Western Europe,1,7.526,7.46,7.592,1.44178,1.16374,0.79504,0.57941,0.44453,0.36171,2.73939
Switzerland,Western Europe,2,7.509,7.428,7.59,1.52733,1.14524,0.86303,0.58557,0.41203,0.28083,2.69463
Canada,North America,6,7.404,7.335,7.473,1.44015,1.0961,0.8276,0.5737,0.31329,0.44834,2.70485
Somaliland Region,Sub-Saharan Africa,97,5.057,4.934,5.18,0.25558,0.75862,0.33108,0.3913,0.36794,0.51479,2.43801
";

pub const YEAR_2017: &str = "\
\"Country\",\"Happiness.Rank\",\"Happiness.Score\",\"Whisker.high\",\"Whisker.low\",\"Economy..GDP.per.Capita.\",\"Family\",\"Health..Life.Expectancy.\",\"Freedom\",\"Generosity\",\"Trust..Government.Corruption.\",\"Dystopia.Residual\"
\"Switzerland\",4,7.494,7.56,7.42,1.56498,1.51691,0.85813,0.62007,0.29055,0.36701,2.27672
\"Canada\",7,7.316,7.38,7.25,1.4792,1.48135,0.83455,0.6111,0.43554,0.28737,2.18726
\"Hong Kong S.A.R., China\",71,5.472,5.55,5.39,1.55168,1.26279,0.94372,0.49097,0.37447,0.29393,0.5546
";

pub const YEAR_2018: &str = "\
Overall rank,Country or region,Score,GDP per capita,Social support,Healthy life expectancy,Freedom to make life choices,Generosity,Perceptions of corruption
5,Switzerland,7.487,1.42,1.549,0.927,0.66,0.256,0.357
7,Canada,7.328,1.33,1.532,0.896,0.653,0.321,0.291
20,United Arab Emirates,6.774,2.096,0.776,0.67,0.284,0.186,N/A
76,Hong Kong,5.43,1.405,1.29,1.03,0.524,0.246,0.291
";

pub const AUX_2018: &str = "\
country,dystopia_residual
Switzerland,2.05
Canada,2.2
United Arab Emirates,2.76
Hong Kong,0.7
";

pub const YEAR_2019: &str = "\
Overall rank,Country or region,Score,GDP per capita,Social support,Healthy life expectancy,Freedom to make life choices,Generosity,Perceptions of corruption
6,Switzerland,7.48,1.452,1.526,1.052,0.572,0.263,0.343
9,Canada,7.278,1.365,1.505,1.039,0.584,0.285,0.308
76,Hong Kong,5.43,1.438,1.277,1.122,0.44,0.258,0.287
";

pub const AUX_2019: &str = "\
country,dystopia_residual
Switzerland,2.27
Canada,2.19
Hong Kong,0.6
";

pub const COUNTRY_CODES: &str = "\
country,country_code
Switzerland,CHE
Canada,CAN
Hong Kong,HKG
Denmark,DNK
United Arab Emirates,ARE
";

/// Row count per fixture year.
pub const ROWS_PER_YEAR: [(i32, usize); 5] = [(2015, 4), (2016, 4), (2017, 3), (2018, 4), (2019, 3)];

pub fn raw_year(year: i32) -> RawTable {
    let content = match year {
        2015 => YEAR_2015,
        2016 => YEAR_2016,
        2017 => YEAR_2017,
        2018 => YEAR_2018,
        2019 => YEAR_2019,
        other => panic!("no fixture for {}", other),
    };
    parse_str(content, ',').unwrap()
}

pub fn raw_auxiliary(year: i32) -> Option<RawTable> {
    match year {
        2018 => Some(parse_str(AUX_2018, ',').unwrap()),
        2019 => Some(parse_str(AUX_2019, ',').unwrap()),
        _ => None,
    }
}

pub fn raw_country_codes() -> RawTable {
    parse_str(COUNTRY_CODES, ',').unwrap()
}

/// Lay the fixtures out the way the builder expects them on disk.
pub fn write_raw_dir(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    for (year, content) in [
        (2015, YEAR_2015),
        (2016, YEAR_2016),
        (2017, YEAR_2017),
        (2018, YEAR_2018),
        (2019, YEAR_2019),
    ] {
        std::fs::write(dir.join(format!("{}.csv", year)), content).unwrap();
    }
    std::fs::write(dir.join("2018_dystopia.csv"), AUX_2018).unwrap();
    std::fs::write(dir.join("2019_dystopia.csv"), AUX_2019).unwrap();
    std::fs::write(dir.join("country_codes.csv"), COUNTRY_CODES).unwrap();
}
