use crate::api::{Kernel, Options};
use crate::directives::Directive;
use crate::engine::{RuleSpec, SubTurn};
use crate::error::EngineError;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn kernel_with(options: Options, rules: &[RuleSpec]) -> Kernel {
    let mut kernel = Kernel::with_rng(options, StdRng::seed_from_u64(42));
    kernel.load_rules(rules).unwrap();
    kernel
}

fn kernel(rules: &[RuleSpec]) -> Kernel {
    kernel_with(Options::default(), rules)
}

fn say(kernel: &mut Kernel, input: &str) -> Option<String> {
    kernel.respond(input, None).unwrap()
}

#[test]
fn knock_knock() {
    let mut kernel = kernel(&[RuleSpec::new().input("Knock knock *").out("Hi <star>!")]);
    assert_eq!(say(&mut kernel, "Knock knock World").as_deref(), Some("Hi World!"));
    assert_eq!(say(&mut kernel, "KNOCK KNOCK   big  world  ").as_deref(), Some("Hi big  world!"));
    assert_eq!(say(&mut kernel, "who is there"), None);
}

#[test]
fn first_matching_rule_wins() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("hello").out("first"),
        RuleSpec::new().input("*").out("catch all"),
        RuleSpec::new().input("hello").out("second"),
    ]);
    for _ in 0..5 {
        assert_eq!(say(&mut kernel, "Hello").as_deref(), Some("first"));
    }
    assert_eq!(say(&mut kernel, "anything").as_deref(), Some("catch all"));
}

#[test]
fn define_then_isdefined() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("who am i").when("isdefined", ["name"]).out("You are <name>."),
        RuleSpec::new().input("who am i").out("I don't know you."),
        RuleSpec::new().input("my name is *").post("define", ["name", "<star>"]).out("Hi <star>."),
        RuleSpec::new().input("forget me").post("delete", ["name"]).out("Done."),
    ]);

    assert_eq!(say(&mut kernel, "who am I").as_deref(), Some("I don't know you."));
    assert_eq!(say(&mut kernel, "my name is Bob").as_deref(), Some("Hi Bob."));
    assert_eq!(say(&mut kernel, "who am I").as_deref(), Some("You are Bob."));
    assert_eq!(say(&mut kernel, "forget me").as_deref(), Some("Done."));
    assert_eq!(say(&mut kernel, "who am I").as_deref(), Some("I don't know you."));
}

#[test]
fn isdefined_accepts_a_variable_reference() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("who am i").when("isdefined", ["<name>"]).out("You are <name>."),
        RuleSpec::new().input("my name is *").post("define", ["name", "Bob"]).out("Noted."),
    ]);

    assert_eq!(say(&mut kernel, "who am i"), None);
    assert_eq!(say(&mut kernel, "my name is Bob").as_deref(), Some("Noted."));
    assert_eq!(say(&mut kernel, "who am i").as_deref(), Some("You are Bob."));
}

#[test]
fn isnotdefined_and_delete_accept_variable_references() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("who am i").when("isnotdefined", ["<name>"]).out("A stranger."),
        RuleSpec::new().input("who am i").out("<name>"),
        RuleSpec::new().input("call me *").post("define", ["name", "<star>"]).out("ok"),
        RuleSpec::new().input("forget me").post("delete", ["<name>"]).out("gone"),
    ]);

    assert_eq!(say(&mut kernel, "who am i").as_deref(), Some("A stranger."));
    say(&mut kernel, "call me Ana");
    assert_eq!(say(&mut kernel, "who am i").as_deref(), Some("Ana"));
    say(&mut kernel, "forget me");
    assert_eq!(say(&mut kernel, "who am i").as_deref(), Some("A stranger."));
}

#[test]
fn gate_params_render_against_current_locals() {
    let mut kernel = Kernel::with_rng(Options::default(), StdRng::seed_from_u64(1));
    kernel.add_directive("present", Directive::predicate(|p, _| Ok(!p[0].is_empty())).with_arity(1)).unwrap();
    kernel
        .load_rules(&[
            RuleSpec::new().input("status").when("present", ["<name>"]).out("known"),
            RuleSpec::new().input("status").out("unknown"),
            RuleSpec::new().input("set *").post("define", ["name", "<star>"]).out("ok"),
        ])
        .unwrap();

    assert_eq!(say(&mut kernel, "status").as_deref(), Some("unknown"));
    say(&mut kernel, "set Bob");
    assert_eq!(say(&mut kernel, "status").as_deref(), Some("known"));
}

#[test]
fn gates_see_stars_of_the_same_rule() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("i am * years old").when("greaterequal", ["<star>", "18"]).out("adult"),
        RuleSpec::new().input("i am * years old").out("minor"),
    ]);
    assert_eq!(say(&mut kernel, "I am 30 years old").as_deref(), Some("adult"));
    assert_eq!(say(&mut kernel, "I am 9 years old").as_deref(), Some("minor"));
    assert_eq!(say(&mut kernel, "I am 18 years old").as_deref(), Some("adult"));
}

#[test]
fn recursive_output_is_the_inner_reply() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("greet me").out("(rec|hello)"),
        RuleSpec::new().input("hello").out("Hi there"),
    ]);
    assert_eq!(say(&mut kernel, "greet me").as_deref(), Some("Hi there"));

    let session = kernel.session("default").unwrap();
    assert_eq!(session.inputs(), ["greet me"]);
    assert_eq!(session.responses(), ["Hi there"]);
}

#[test]
fn recursion_splices_each_token_in_place() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("both").out("A (rec|one) B (rec|nothing here) C"),
        RuleSpec::new().input("one").out("1"),
    ]);
    assert_eq!(say(&mut kernel, "both").as_deref(), Some("A 1 B  C"));
}

#[test]
fn recursion_reports_sub_turns() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("outer").out("{(rec|middle)}"),
        RuleSpec::new().input("middle").out("[(rec|inner)]"),
        RuleSpec::new().input("inner").out("x"),
    ]);
    let details = kernel.respond_verbose("outer", None).unwrap();
    assert_eq!(details.output.as_deref(), Some("{[x]}"));
    assert_eq!(details.matched_rule, Some(0));
    assert_eq!(details.rules_tried, 1);
    assert_eq!(
        details.recursion,
        vec![
            SubTurn { depth: 1, input: "middle".to_string(), matched_rule: Some(1) },
            SubTurn { depth: 2, input: "inner".to_string(), matched_rule: Some(2) },
        ]
    );
}

#[test]
fn runaway_recursion_hits_the_limit() {
    let options = Options { max_recursion_depth: Some(3), ..Options::default() };
    let mut kernel = kernel_with(options, &[RuleSpec::new().input("loop").out("again (rec|loop)")]);
    assert!(matches!(kernel.respond("loop", None), Err(EngineError::RecursionLimit { limit: 3 })));
}

#[test]
fn recursion_within_the_limit_succeeds() {
    let options = Options { max_recursion_depth: Some(1), ..Options::default() };
    let mut kernel = kernel_with(
        options,
        &[RuleSpec::new().input("a").out("(rec|b)"), RuleSpec::new().input("b").out("done")],
    );
    assert_eq!(say(&mut kernel, "a").as_deref(), Some("done"));
}

#[test]
fn unknown_user_fails_without_side_effects() {
    let mut kernel = kernel(&[RuleSpec::new().input("*").out("ok")]);
    let err = kernel.respond("hi", Some("ghost")).unwrap_err();
    assert!(matches!(err, EngineError::UnknownUser { ref id } if id == "ghost"));
    assert_eq!(kernel.active_user(), Some("default"));
    assert!(kernel.session("default").unwrap().inputs().is_empty());
    assert!(kernel.session("ghost").is_none());
}

#[test]
fn sessions_are_independent() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("i like *").post("define", ["likes", "<star>"]).out("noted"),
        RuleSpec::new().input("what do i like").out("<likes>"),
    ]);
    kernel.add_user("ana").unwrap();
    kernel.add_user("bia").unwrap();

    kernel.respond("I like tea", Some("ana")).unwrap();
    kernel.respond("I like coffee", Some("bia")).unwrap();
    assert_eq!(kernel.respond("what do I like", Some("ana")).unwrap().as_deref(), Some("tea"));
    assert_eq!(kernel.respond("what do I like", None).unwrap().as_deref(), Some("tea"));
    assert_eq!(kernel.respond("what do I like", Some("bia")).unwrap().as_deref(), Some("coffee"));
    assert_eq!(kernel.active_user(), Some("bia"));
}

#[test]
fn after_matches_the_previous_reply() {
    let mut kernel = kernel(&[
        RuleSpec::new().after("who is there").ignore("?").input("*").out("<star> who?"),
        RuleSpec::new().input("knock knock").out("Who is there?"),
    ]);
    assert_eq!(say(&mut kernel, "Bob"), None);
    assert_eq!(say(&mut kernel, "Knock knock").as_deref(), Some("Who is there?"));
    assert_eq!(say(&mut kernel, "Bob").as_deref(), Some("Bob who?"));
    // the last reply is now "Bob who?"
    assert_eq!(say(&mut kernel, "Bob"), None);
}

#[test]
fn history_records_unanswered_input() {
    let mut kernel = kernel(&[RuleSpec::new().input("ping").out("pong")]);
    assert_eq!(say(&mut kernel, "hello?"), None);
    say(&mut kernel, "ping");

    let session = kernel.session("default").unwrap();
    assert_eq!(session.inputs(), ["hello?", "ping"]);
    assert_eq!(session.responses(), ["pong"]);
}

#[test]
fn synonyms_and_meanings_apply_to_rules_and_input() {
    let mut kernel = Kernel::with_rng(Options::default(), StdRng::seed_from_u64(5));
    kernel.add_synonyms(&["hello", "hi", "hey", "olá"]).unwrap();
    kernel.add_meaning("farewell", &["bye", "see you"]).unwrap();
    kernel
        .load_rules(&[
            RuleSpec::new().input("Hi *").out("greeting for <star>"),
            RuleSpec::new().input("(mean|farewell) *").out("farewell for <star>"),
            RuleSpec::new().mean("color", ["red", "blue"]).input("i like (mean|color)").out("nice color"),
        ])
        .unwrap();

    assert_eq!(say(&mut kernel, "Olá Ana").as_deref(), Some("greeting for ana"));
    assert_eq!(say(&mut kernel, "HEY Ana").as_deref(), Some("greeting for ana"));
    assert_eq!(say(&mut kernel, "see you Ana").as_deref(), Some("farewell for ana"));
    assert_eq!(say(&mut kernel, "I like BLUE").as_deref(), Some("nice color"));
    assert_eq!(say(&mut kernel, "I like green"), None);
}

#[test]
fn globals_and_locals_render_into_output() {
    let mut kernel = kernel(&[RuleSpec::new().input("name *").post("define", ["name", "<star>"]).out("ok")]);
    kernel.load_rules(&[RuleSpec::new().input("intro").out("I am <botname>, you are <name>.")]).unwrap();
    kernel.set_global("botname", "Zed");

    assert_eq!(say(&mut kernel, "intro").as_deref(), Some("I am Zed, you are ."));
    say(&mut kernel, "name Ana");
    assert_eq!(say(&mut kernel, "intro").as_deref(), Some("I am Zed, you are Ana."));
}

#[test]
fn seeded_choice_is_reproducible() {
    let rules = [RuleSpec::new().input("roll").out("one").out("two").out("three").out("four")];
    let replies = |seed: u64| {
        let mut kernel = Kernel::with_rng(Options::default(), StdRng::seed_from_u64(seed));
        kernel.load_rules(&rules).unwrap();
        (0..20).map(|_| kernel.respond("roll", None).unwrap().unwrap_or_default()).collect::<Vec<_>>()
    };

    let first = replies(9);
    assert_eq!(first, replies(9));
    assert!(first.iter().all(|r| ["one", "two", "three", "four"].contains(&r.as_str())));
}

#[test]
fn out_of_range_star_fails_the_turn() {
    let mut kernel = kernel(&[RuleSpec::new().input("hello *").out("<star 1>")]);
    assert!(matches!(kernel.respond("hello there", None), Err(EngineError::StarIndex { index: 1, len: 1 })));
}

#[test]
fn failing_post_action_fails_the_turn() {
    let mut kernel = Kernel::with_rng(Options::default(), StdRng::seed_from_u64(1));
    kernel
        .add_directive(
            "explode",
            Directive::action(|_, _| Err(EngineError::Directive { name: "explode".into(), message: "boom".into() })),
        )
        .unwrap();
    kernel.load_rules(&[RuleSpec::new().input("go").post("explode", Vec::<String>::new()).out("never")]).unwrap();
    assert!(matches!(kernel.respond("go", None), Err(EngineError::Directive { .. })));
}

#[test]
fn in_captures_overwrite_after_captures() {
    let mut kernel = kernel(&[
        RuleSpec::new().after("your name is *").input("*").out("<star>"),
        RuleSpec::new().input("guess").out("Your name is Ana"),
    ]);

    assert_eq!(say(&mut kernel, "guess").as_deref(), Some("Your name is Ana"));
    assert_eq!(say(&mut kernel, "Bob").as_deref(), Some("Bob"));
}

#[test]
fn after_captures_render_without_an_in_stage() {
    let mut kernel = kernel(&[
        RuleSpec::new().after("your name is *").out("<star>"),
        RuleSpec::new().input("guess").out("Your name is Ana"),
    ]);

    assert_eq!(say(&mut kernel, "guess").as_deref(), Some("Your name is Ana"));
    assert_eq!(say(&mut kernel, "anything").as_deref(), Some("Ana"));
    assert_eq!(say(&mut kernel, "anything"), None);
}

#[test]
fn ignored_characters_drop_out_of_rules_and_input() {
    let mut kernel = kernel(&[
        RuleSpec::new().input("how are you?").ignore("?!").out("fine"),
        RuleSpec::new().input("my name is *?").ignore("?!").out("hi <star>"),
    ]);

    assert_eq!(say(&mut kernel, "how are you?!").as_deref(), Some("fine"));
    assert_eq!(say(&mut kernel, "how are you").as_deref(), Some("fine"));
    assert_eq!(say(&mut kernel, "My name is Ana?!").as_deref(), Some("hi Ana"));
    assert_eq!(say(&mut kernel, "how are you."), None);
}
