//! Bidirectional synonym table used for query expansion.
//!
//! Entries map a canonical term to its synonyms. A reverse index (synonym ->
//! canonical keys) is kept in step with every mutation so that reverse lookups
//! do not scan the whole table.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

const DEFAULT_ENTRIES: &[(&str, &[&str])] = &[
    // authentication
    ("로그인", &["login", "signin", "auth"]),
    ("로그아웃", &["logout", "signout"]),
    ("회원가입", &["signup", "register", "join"]),
    ("인증", &["authentication", "auth"]),
    // user info (all served by the info API)
    ("내정보", &["info", "myinfo", "account info"]),
    ("프로필", &["profile", "user profile", "info"]),
    ("사용자정보", &["user info", "account", "info"]),
    ("마이페이지", &["mypage", "my page", "info"]),
    ("계정정보", &["account info", "info"]),
    // credentials
    ("토큰", &["token", "jwt", "bearer"]),
    ("쿠키", &["cookie", "session"]),
    // frameworks
    ("react", &["react", "리액트", "jsx", "tsx"]),
    ("vue", &["vue", "뷰", "vuejs"]),
    ("next.js", &["nextjs", "next", "넥스트"]),
    ("바닐라", &["vanilla", "javascript", "js"]),
    // crud
    ("생성", &["create", "add", "new"]),
    ("조회", &["get", "fetch", "read"]),
    ("수정", &["update", "edit", "modify"]),
    ("삭제", &["delete", "remove"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SynonymStats {
    pub total_terms: usize,
    pub total_synonyms: usize,
    pub avg_synonyms_per_term: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SynonymDictionary {
    entries: HashMap<String, Vec<String>>,
    reverse: HashMap<String, BTreeSet<String>>,
}

fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}

fn push_unique(seen: &mut HashSet<String>, out: &mut Vec<String>, term: &str) {
    if seen.insert(term.to_string()) {
        out.push(term.to_string());
    }
}

impl SynonymDictionary {
    /// Dictionary preloaded with the built-in Korean/English vocabulary.
    pub fn new() -> Self {
        let mut dict = Self::empty();
        for &(term, synonyms) in DEFAULT_ENTRIES {
            dict.add_synonym(term, synonyms);
        }
        dict
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Direct synonyms of a canonical term.
    pub fn synonyms_of(&self, term: &str) -> &[String] {
        self.entries.get(&normalize(term)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Expand terms with their synonyms in both directions.
    ///
    /// Each input contributes itself, its direct synonyms, and for every
    /// canonical key that lists it as a synonym, that key plus the key's other
    /// synonyms. Only one hop is followed. Output is deduplicated and keeps
    /// discovery order.
    pub fn expand<S: AsRef<str>>(&self, terms: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for term in terms {
            let term = normalize(term.as_ref());
            if term.is_empty() {
                continue;
            }
            push_unique(&mut seen, &mut out, &term);
            for synonym in self.entries.get(&term).into_iter().flatten() {
                push_unique(&mut seen, &mut out, synonym);
            }
            for key in self.reverse.get(&term).into_iter().flatten() {
                push_unique(&mut seen, &mut out, key);
                for synonym in self.entries.get(key).into_iter().flatten() {
                    push_unique(&mut seen, &mut out, synonym);
                }
            }
        }
        out
    }

    /// Add synonyms to `term`, creating the entry if needed. Duplicates are ignored.
    pub fn add_synonym<S: AsRef<str>>(&mut self, term: &str, synonyms: &[S]) {
        let term = normalize(term);
        if term.is_empty() {
            return;
        }
        let mut added = Vec::new();
        {
            let list = self.entries.entry(term.clone()).or_default();
            for synonym in synonyms {
                let synonym = normalize(synonym.as_ref());
                if synonym.is_empty() || list.contains(&synonym) {
                    continue;
                }
                list.push(synonym.clone());
                added.push(synonym);
            }
            if list.is_empty() {
                self.entries.remove(&term);
            }
        }
        for synonym in added {
            self.reverse.entry(synonym).or_default().insert(term.clone());
        }
    }

    /// Remove one synonym from `term`. The entry disappears with its last
    /// synonym. Returns whether anything was removed.
    pub fn remove_synonym(&mut self, term: &str, synonym: &str) -> bool {
        let term = normalize(term);
        let synonym = normalize(synonym);
        let Some(list) = self.entries.get_mut(&term) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| *s != synonym);
        if list.len() == before {
            return false;
        }
        if list.is_empty() {
            self.entries.remove(&term);
        }
        if let Some(keys) = self.reverse.get_mut(&synonym) {
            keys.remove(&term);
            if keys.is_empty() {
                self.reverse.remove(&synonym);
            }
        }
        true
    }

    /// True if `term` is a canonical key or a synonym of one.
    pub fn has_term(&self, term: &str) -> bool {
        let term = normalize(term);
        self.entries.contains_key(&term) || self.reverse.contains_key(&term)
    }

    /// Every key and synonym, sorted.
    pub fn all_terms(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self.entries.keys().chain(self.reverse.keys()).collect();
        all.into_iter().cloned().collect()
    }

    pub fn stats(&self) -> SynonymStats {
        let total_terms = self.entries.len();
        let total_synonyms = self.entries.values().map(Vec::len).sum();
        let avg = if total_terms > 0 { total_synonyms as f64 / total_terms as f64 } else { 0.0 };
        SynonymStats {
            total_terms,
            total_synonyms,
            avg_synonyms_per_term: (avg * 100.0).round() / 100.0,
        }
    }
}
