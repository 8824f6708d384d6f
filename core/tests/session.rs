//! End-to-end session scenarios over a real on-disk dictionary.

use std::sync::Arc;

use tempfile::TempDir;

use zhuyin_core::syllable::Bopomofo::*;
use zhuyin_core::{
    syl, Config, KeyBehavior, KeyEvent, KeyboardLayout, Session, TrieBuilder, TrieDictionary,
    UserDict,
};

fn build_fixture(dir: &TempDir) -> Arc<TrieDictionary> {
    let mut builder = TrieBuilder::new();
    let entries: &[(&str, u32, &str)] = &[
        ("測", 300, "ㄘㄜˋ"),
        ("冊", 100, "ㄘㄜˋ"),
        ("側", 50, "ㄘㄜˋ"),
        ("是", 8000, "ㄕˋ"),
        ("事", 3000, "ㄕˋ"),
        ("試", 2000, "ㄕˋ"),
        ("測試", 500, "ㄘㄜˋ ㄕˋ"),
        ("你", 5000, "ㄋㄧˇ"),
        ("好", 3000, "ㄏㄠˇ"),
        ("你好", 800, "ㄋㄧˇ ㄏㄠˇ"),
        ("中", 4000, "ㄓㄨㄥ"),
        ("國", 2000, "ㄍㄨㄛˊ"),
        ("中國", 600, "ㄓㄨㄥ ㄍㄨㄛˊ"),
        ("那", 3000, "ㄋㄚˋ"),
        ("案", 1000, "ㄢˋ"),
    ];
    for (phrase, freq, syllables) in entries {
        let syllables: Vec<_> = syllables
            .split_whitespace()
            .map(|s| s.parse().unwrap())
            .collect();
        builder.insert(&syllables, phrase, *freq).unwrap();
    }
    let arena = dir.path().join("dict.dat");
    let tree = dir.path().join("fonetree.dat");
    builder.write_to(&arena, &tree).unwrap();
    Arc::new(TrieDictionary::open(&arena, &tree).unwrap())
}

fn session_with(config: Config) -> (TempDir, Session) {
    let dir = tempfile::tempdir().unwrap();
    let dict = build_fixture(&dir);
    (dir, Session::new(dict, UserDict::in_memory(), config))
}

fn type_keys(session: &mut Session, keys: &str) {
    for c in keys.chars() {
        session.handle_key(KeyEvent::Char(c));
    }
}

#[test]
fn single_syllable_commit() {
    let (_dir, mut session) = session_with(Config::default());
    type_keys(&mut session, "hk4");
    assert_eq!("測", session.preedit());
    assert_eq!(KeyBehavior::Commit, session.handle_key(KeyEvent::Enter));
    assert_eq!("測", session.take_commit());
    assert_eq!("", session.preedit());
}

#[test]
fn two_syllable_phrase_commit() {
    let (_dir, mut session) = session_with(Config::default());
    type_keys(&mut session, "su3cl3");
    assert_eq!("你好", session.preedit());
    session.handle_key(KeyEvent::Enter);
    assert_eq!("你好", session.take_commit());
}

#[test]
fn hsu_layout_composition() {
    let mut config = Config::default();
    config.keyboard_layout = KeyboardLayout::Hsu;
    let (_dir, mut session) = session_with(config);
    // n=ㄋ y=ㄚ j=ˋ on Hsu
    type_keys(&mut session, "nyj");
    assert_eq!("那", session.preedit());
    session.handle_key(KeyEvent::Enter);
    assert_eq!("那", session.take_commit());
}

#[test]
fn hsu_lone_initial_promotes_to_rime() {
    let mut config = Config::default();
    config.keyboard_layout = KeyboardLayout::Hsu;
    let (_dir, mut session) = session_with(config);
    // m alone is ㄇ; in front of the ˋ tone it reads as ㄢ
    type_keys(&mut session, "mj");
    assert_eq!("案", session.preedit());
}

#[test]
fn easy_symbol_mode_commits_fullwidth_bracket() {
    let mut config = Config::default();
    config.easy_symbol_mode = true;
    let (_dir, mut session) = session_with(config);
    assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Char('[')));
    assert_eq!("「", session.preedit());
    session.handle_key(KeyEvent::Enter);
    assert_eq!("「", session.take_commit());
}

#[test]
fn fullshape_mode_commits_fullwidth_ascii() {
    let mut config = Config::default();
    config.fullshape_mode = true;
    let (_dir, mut session) = session_with(config);
    assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Char('!')));
    session.handle_key(KeyEvent::Enter);
    assert_eq!("！", session.take_commit());
}

#[test]
fn symbols_interleave_with_phrases() {
    let mut config = Config::default();
    config.easy_symbol_mode = true;
    let (_dir, mut session) = session_with(config);
    type_keys(&mut session, "su3cl3");
    session.handle_key(KeyEvent::Char('!'));
    assert_eq!("你好！", session.preedit());
    session.handle_key(KeyEvent::Enter);
    assert_eq!("你好！", session.take_commit());
}

#[test]
fn candidate_selection_updates_user_store() {
    let (_dir, mut session) = session_with(Config::default());
    type_keys(&mut session, "hk4g4");
    assert_eq!("測試", session.preedit());

    // open the window at the second syllable and take the second candidate
    assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Down));
    assert_eq!(vec!["是", "事", "試"], session.candidates());
    assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Char('2')));
    assert_eq!("測事", session.preedit());

    session.handle_key(KeyEvent::Enter);
    assert_eq!("測事", session.take_commit());
    assert!(session.user_dict().contains(&[syl![SH, TONE4]], "事"));
}

#[test]
fn selection_compatible_with_longer_phrase_still_learns() {
    let (_dir, mut session) = session_with(Config::default());
    type_keys(&mut session, "hk4g4");
    session.handle_key(KeyEvent::Down);
    session.handle_key(KeyEvent::Char('3'));
    // 試 agrees with 測試, so the longer phrase keeps the span
    assert_eq!("測試", session.preedit());
    session.handle_key(KeyEvent::Enter);
    assert_eq!("測試", session.take_commit());
    // the picked pair is learned regardless
    assert!(session.user_dict().contains(&[syl![SH, TONE4]], "試"));

    // picking it again bumps the existing entry instead of re-adding
    type_keys(&mut session, "g4");
    session.handle_key(KeyEvent::Down);
    let second = session
        .candidates()
        .iter()
        .position(|c| c == "試")
        .unwrap();
    session.handle_key(KeyEvent::Char(char::from(b'1' + second as u8)));
    session.handle_key(KeyEvent::Enter);
    assert_eq!("試", session.take_commit());
    assert_eq!(1, session.user_dict().len());
}

#[test]
fn tab_cycles_and_reset_on_edit() {
    let (_dir, mut session) = session_with(Config::default());
    type_keys(&mut session, "hk4g4");
    assert_eq!("測試", session.preedit());
    session.handle_key(KeyEvent::Tab);
    assert_eq!("測是", session.preedit());
    // editing resets the cycle to the best segmentation
    type_keys(&mut session, "hk4");
    assert_eq!("測試測", session.preedit());
}

#[test]
fn space_as_selection_opens_window() {
    let mut config = Config::default();
    config.space_as_selection = true;
    let (_dir, mut session) = session_with(config);
    type_keys(&mut session, "hk4");
    assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Space));
    assert!(session.is_selecting());
    assert_eq!(vec!["測", "冊", "側"], session.candidates());
}

#[test]
fn candidate_paging() {
    let mut config = Config::default();
    config.set_candidates_per_page(2);
    let (_dir, mut session) = session_with(config);
    type_keys(&mut session, "g4");
    session.handle_key(KeyEvent::Down);
    assert_eq!(vec!["是", "事"], session.candidates());
    session.handle_key(KeyEvent::Down);
    assert_eq!(vec!["試"], session.candidates());
    // wraps around
    session.handle_key(KeyEvent::Down);
    assert_eq!(vec!["是", "事"], session.candidates());
}

#[test]
fn rearward_candidate_search() {
    let mut config = Config::default();
    config.phrase_choice_rearward = true;
    let (_dir, mut session) = session_with(config);
    type_keys(&mut session, "hk4g4");
    // cursor is at the end; rearward looks at the syllable before it
    session.handle_key(KeyEvent::Down);
    let candidates = session.candidates();
    assert!(candidates.contains(&"測試".to_string()));
    assert!(candidates.contains(&"是".to_string()));
}

#[test]
fn preedit_cap_is_respected() {
    let mut config = Config::default();
    config.set_max_chi_symbol_len(3);
    let (_dir, mut session) = session_with(config);
    for _ in 0..3 {
        type_keys(&mut session, "hk4");
    }
    assert_eq!(3, session.preedit().chars().count());
    type_keys(&mut session, "hk");
    assert_eq!(
        KeyBehavior::KeyError,
        session.handle_key(KeyEvent::Char('4'))
    );
    assert_eq!(3, session.preedit().chars().count());
}

#[test]
fn cursor_moves_and_reports() {
    let (_dir, mut session) = session_with(Config::default());
    type_keys(&mut session, "su3cl3");
    assert_eq!(2, session.cursor());
    // inside the 你好 span the display cursor sits after the phrase
    session.handle_key(KeyEvent::Left);
    assert_eq!(2, session.cursor());
    session.handle_key(KeyEvent::Left);
    assert_eq!(0, session.cursor());
    assert_eq!(KeyBehavior::Ignore, session.handle_key(KeyEvent::Left));
    assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Right));
}

#[test]
fn backspace_deletes_syllable_and_resegments() {
    let (_dir, mut session) = session_with(Config::default());
    type_keys(&mut session, "su3cl3");
    assert_eq!("你好", session.preedit());
    session.handle_key(KeyEvent::Backspace);
    assert_eq!("你", session.preedit());
}

#[test]
fn pinyin_layout_end_to_end() {
    let mut config = Config::default();
    config.keyboard_layout = KeyboardLayout::HanyuPinyin;
    let (_dir, mut session) = session_with(config);
    type_keys(&mut session, "ni3hao3");
    assert_eq!("你好", session.preedit());
    session.handle_key(KeyEvent::Enter);
    assert_eq!("你好", session.take_commit());
}

#[test]
fn unknown_syllable_shows_bopomofo() {
    let (_dir, mut session) = session_with(Config::default());
    // ㄆㄥˊ is not in the fixture dictionary
    session.handle_key(KeyEvent::Char('q'));
    session.handle_key(KeyEvent::Char('/'));
    assert_eq!(KeyBehavior::NoWord, session.handle_key(KeyEvent::Char('6')));
    assert_eq!("ㄆㄥˊ", session.preedit());
}
