//! Error codes for all checker diagnostics.

use std::fmt;

/// Stable codes for semantic diagnostics.
///
/// Format: E#### with the 2xxx block reserved for semantic analysis and
/// 9xxx for internal inconsistencies.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Type mismatch
    E2001,
    /// Expected a type
    E2002,
    /// Expected an interface
    E2003,
    /// Expected a function
    E2004,
    /// Undefined identifier
    E2005,
    /// Ambiguous reference
    E2006,
    /// No applicable overload
    E2007,
    /// Ambiguous overload
    E2008,
    /// Generic argument inference failed
    E2009,
    /// Not enough arguments
    E2010,
    /// Too many arguments
    E2011,
    /// Expected a prefix operator
    E2012,
    /// Expected a postfix operator
    E2013,
    /// Invalid array size
    E2014,
    /// Type has no member of that name
    E2015,
    /// Subscript on a non-array type
    E2016,
    /// Subscript index is not an integer
    E2017,
    /// `void` used where a usable type is required
    E2018,
    /// Parameter already defined
    E2019,
    /// `break` outside a breakable statement
    E2020,
    /// `continue` outside a loop
    E2021,
    /// `case` outside a switch
    E2022,
    /// `default` outside a switch
    E2023,
    /// `return` needs an expression
    E2024,
    /// Expected an integer constant expression
    E2025,
    /// Expected an integer constant, not a symbolic value
    E2026,
    /// Redeclaration with a different return type
    E2027,
    /// Function redefinition
    E2028,
    /// Assignment to a non-l-value
    E2029,
    /// Argument to an `out` parameter must be an l-value
    E2030,
    /// Invalid swizzle
    E2031,
    /// Overload candidate (note)
    E2032,
    /// See definition (note)
    E2033,
    /// More overload candidates not shown (note)
    E2034,
    /// Construct not supported here
    E2099,
    /// Internal inconsistency
    E9001,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E2008 => "E2008",
            ErrorCode::E2009 => "E2009",
            ErrorCode::E2010 => "E2010",
            ErrorCode::E2011 => "E2011",
            ErrorCode::E2012 => "E2012",
            ErrorCode::E2013 => "E2013",
            ErrorCode::E2014 => "E2014",
            ErrorCode::E2015 => "E2015",
            ErrorCode::E2016 => "E2016",
            ErrorCode::E2017 => "E2017",
            ErrorCode::E2018 => "E2018",
            ErrorCode::E2019 => "E2019",
            ErrorCode::E2020 => "E2020",
            ErrorCode::E2021 => "E2021",
            ErrorCode::E2022 => "E2022",
            ErrorCode::E2023 => "E2023",
            ErrorCode::E2024 => "E2024",
            ErrorCode::E2025 => "E2025",
            ErrorCode::E2026 => "E2026",
            ErrorCode::E2027 => "E2027",
            ErrorCode::E2028 => "E2028",
            ErrorCode::E2029 => "E2029",
            ErrorCode::E2030 => "E2030",
            ErrorCode::E2031 => "E2031",
            ErrorCode::E2032 => "E2032",
            ErrorCode::E2033 => "E2033",
            ErrorCode::E2034 => "E2034",
            ErrorCode::E2099 => "E2099",
            ErrorCode::E9001 => "E9001",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
