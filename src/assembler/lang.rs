use crate::isa::inst::{Directive, Keyword, Mnemonic};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use strum::IntoEnumIterator;

static STORAGE: Lazy<Lang> = Lazy::new(Lang::new);

/// The reserved words of the language, keyed by their (uppercase) spelling.
pub struct Lang {
    keywords: HashMap<String, Keyword>,
}

impl Lang {
    fn new() -> Self {
        let mut builder = Builder::new();
        for m in Mnemonic::iter() {
            builder.register(m.into());
        }
        for d in Directive::iter() {
            builder.register(d.into());
        }
        builder.build()
    }

    pub fn get() -> &'static Lang {
        Lazy::force(&STORAGE)
    }

    pub fn lookup_keyword(&self, name: &str) -> Option<Keyword> {
        self.keywords.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        self.lookup_keyword(name).is_some()
    }
}

struct Builder {
    lang: Lang,
}

impl Builder {
    fn new() -> Self {
        Builder {
            lang: Lang {
                keywords: HashMap::new(),
            },
        }
    }

    fn register(&mut self, keyword: Keyword) {
        if self
            .lang
            .keywords
            .insert(keyword.to_string(), keyword)
            .is_some()
        {
            panic!("Duplicate keyword: {}", keyword);
        }
    }

    fn build(self) -> Lang {
        self.lang
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(
            Lang::get().lookup_keyword("mov"),
            Some(Keyword::Mnemonic(Mnemonic::MOV))
        );
        assert_eq!(
            Lang::get().lookup_keyword("ORG"),
            Some(Keyword::Directive(Directive::ORG))
        );
        assert!(!Lang::get().is_keyword("LOOP"));
        assert!(!Lang::get().is_keyword("AND"));
    }
}
