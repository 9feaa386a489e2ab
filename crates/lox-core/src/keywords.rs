use crate::scanner::token::TokenType;

pub const KEYWORDS: [&str; 17] = [
    "and", "break", "class", "else", "false", "for", "fun", "if", "nil", "or", "print", "return",
    "super", "this", "true", "var", "while",
];

/// Maps a scanned word to its keyword token type, if it is reserved.
pub fn keyword(text: &str) -> Option<TokenType> {
    match text {
        "and" => Some(TokenType::And),
        "break" => Some(TokenType::Break),
        "class" => Some(TokenType::Class),
        "else" => Some(TokenType::Else),
        "false" => Some(TokenType::False),
        "for" => Some(TokenType::For),
        "fun" => Some(TokenType::Fun),
        "if" => Some(TokenType::If),
        "nil" => Some(TokenType::Nil),
        "or" => Some(TokenType::Or),
        "print" => Some(TokenType::Print),
        "return" => Some(TokenType::Return),
        "super" => Some(TokenType::Super),
        "this" => Some(TokenType::This),
        "true" => Some(TokenType::True),
        "var" => Some(TokenType::Var),
        "while" => Some(TokenType::While),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_keyword_is_reserved() {
        for word in KEYWORDS {
            assert!(keyword(word).is_some(), "'{}' should be a keyword", word);
        }
    }

    #[test]
    fn near_misses_are_identifiers() {
        assert_eq!(keyword("While"), None);
        assert_eq!(keyword("classy"), None);
        assert_eq!(keyword("_var"), None);
    }
}
