//! End-to-end scenarios for lockup
//!
//! Each test drives the public surface the way a consuming library would:
//! wrap invocables, seal entities and inspect what crosses the boundary.

use lockup::{
    arguments, create_namespace, label_of, reclassify_module, Apprehender, Apprehension,
    Arguments, BoundaryError, ClassDraft, Completion, Descriptor, ErrorKind, Fault, Interceptor,
    Invocable, MutableAttributeGuard, OpenModule, Registry, Routine, Seal, Signature, Subject, Value,
};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct DivisionByZero {
    dividend: i64,
}

impl fmt::Display for DivisionByZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "integer division of {} by zero", self.dividend)
    }
}

impl Error for DivisionByZero {}

#[derive(Debug)]
struct Jammed;

impl fmt::Display for Jammed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("jammed")
    }
}

impl Error for Jammed {}

fn divide(entered: Arc<AtomicBool>) -> Routine {
    Routine::new(
        Descriptor::function("arithmetic", "divide")
            .with_signature(Signature::new().positional("a").positional("b")),
        move |arguments| {
            entered.store(true, Ordering::SeqCst);
            let a = arguments.positional()[0].as_integer().unwrap_or_default();
            let b = arguments.positional()[1].as_integer().unwrap_or_default();
            if b == 0 {
                return Err(DivisionByZero { dividend: a }.into());
            }
            Ok(Value::Integer(a / b))
        },
    )
}

fn boundary_error(fault: &Fault) -> &BoundaryError {
    fault
        .downcast_ref::<BoundaryError>()
        .expect("only sanctioned errors cross the boundary")
}

// ============================================================================
// INTERCEPTION SCENARIOS
// ============================================================================

#[test]
fn division_by_zero_is_apprehended() {
    let divide = Interceptor::ours()
        .intercept(divide(Arc::new(AtomicBool::new(false))))
        .unwrap();

    let fault = divide.invoke(arguments![4, 0]).unwrap_err();
    let error = boundary_error(&fault);
    assert_eq!(error.kind(), ErrorKind::InvalidState);
    assert_eq!(error.label("failure class"), Some("fugitive apprehension"));
    assert!(error.cause().unwrap().is::<DivisionByZero>());
    assert_eq!(
        error.to_string(),
        "Apprehension of fugitive exception of class 'scenarios.DivisionByZero' \
         at boundary of function 'divide' on module 'arithmetic'."
    );
}

#[test]
fn surplus_arguments_never_enter() {
    let entered = Arc::new(AtomicBool::new(false));
    let divide = Interceptor::ours().intercept(divide(Arc::clone(&entered))).unwrap();

    let fault = divide.invoke(arguments![1, 2, 3]).unwrap_err();
    let error = boundary_error(&fault);
    assert_eq!(error.kind(), ErrorKind::IncorrectData);
    assert_eq!(
        error.to_string(),
        "Incompatible arguments for invocation of function 'divide' on module 'arithmetic': \
         too many positional arguments"
    );
    assert!(!entered.load(Ordering::SeqCst));

    let quotient = divide.invoke(arguments![9, 3]).unwrap();
    assert!(matches!(quotient, Completion::Returned(Value::Integer(3))));
    assert!(entered.load(Ordering::SeqCst));
}

#[test]
fn sanctioned_errors_keep_their_identity() {
    let routine = Routine::new(Descriptor::function("inventory", "audit"), |_| {
        let module = OpenModule::new("inventory").reclassify();
        module.attribute("stock")?;
        Ok(Value::Unit)
    });
    let audit = Interceptor::ours().intercept(routine).unwrap();
    let fault = audit.invoke(Arguments::new()).unwrap_err();
    let error = boundary_error(&fault);
    assert_eq!(error.kind(), ErrorKind::InaccessibleAttribute);
    assert!(error.cause().is_none());
}

#[test]
fn at_liberty_preserves_the_original_object() {
    let raised = Arc::new(std::sync::Mutex::new(None::<u64>));
    let witness = Arc::clone(&raised);
    let policy = move |_: &Registry, fault: &Fault, _: &Arc<Descriptor>| {
        *witness.lock().unwrap() = Some(fault.identity());
        Ok::<_, Fault>(Apprehension::AtLiberty)
    };
    let interceptor = Interceptor::new(Registry::ours().clone(), policy).unwrap();
    let divide = interceptor
        .intercept(divide(Arc::new(AtomicBool::new(false))))
        .unwrap();

    let fault = divide.invoke(arguments![1, 0]).unwrap_err();
    assert!(fault.is::<DivisionByZero>());
    assert_eq!(*raised.lock().unwrap(), Some(fault.identity()));

    let jammed = Routine::new(Descriptor::function("machinery", "jam"), |_| Err(Jammed.into()));
    let jam = interceptor.intercept(jammed).unwrap();
    let first = jam.invoke(Arguments::new()).unwrap_err();
    assert_eq!(*raised.lock().unwrap(), Some(first.identity()));
    let second = jam.invoke(Arguments::new()).unwrap_err();
    assert!(second.is::<Jammed>());
    assert_ne!(first.identity(), second.identity());
    assert_eq!(*raised.lock().unwrap(), Some(second.identity()));
}

struct Verdicts;

impl Apprehender for Verdicts {
    fn apprehend(
        &self,
        registry: &Registry,
        fault: &Fault,
        _invocable: &Arc<Descriptor>,
    ) -> Result<Apprehension, Fault> {
        let Some(message) = fault.downcast_ref::<lockup::Panicked>().map(|p| p.message().to_owned())
        else {
            return Ok(Apprehension::Released);
        };
        let replacement = registry.raise(&lockup::definitions::INVALID_STATE, arguments![message.clone()]);
        Ok(match message.as_str() {
            "custody" => Apprehension::InCustody(replacement),
            _ => Apprehension::Untraceable(replacement),
        })
    }
}

#[test]
fn every_outcome_of_the_apprehension_table() {
    let interceptor = Interceptor::new(Registry::ours().clone(), Verdicts).unwrap();
    let panicking = Routine::new(
        Descriptor::function("outcomes", "panicking")
            .with_signature(Signature::new().positional("message")),
        |arguments| panic!("{}", arguments.positional()[0].as_text().unwrap_or_default()),
    );
    let panicking = interceptor.intercept(panicking).unwrap();

    let fault = panicking.invoke(arguments!["custody"]).unwrap_err();
    let error = boundary_error(&fault);
    assert_eq!(error.kind(), ErrorKind::InvalidState);
    assert!(error.cause().unwrap().is::<lockup::Panicked>());

    let fault = panicking.invoke(arguments!["untraceable"]).unwrap_err();
    assert!(boundary_error(&fault).cause().is_none());

    let failing = Routine::new(Descriptor::function("outcomes", "failing"), |_| {
        Err(DivisionByZero { dividend: 1 }.into())
    });
    let failing = interceptor.intercept(failing).unwrap();
    match failing.invoke(Arguments::new()).unwrap() {
        Completion::Recovered(fault) => assert!(fault.is::<DivisionByZero>()),
        Completion::Returned(value) => panic!("unexpected return {value}"),
    }
}

#[test]
fn labels_survive_interception() {
    let registry = Registry::ours();
    let original = divide(Arc::new(AtomicBool::new(false)));
    let before = label_of(registry, &Subject::Invocable(Arc::clone(original.descriptor())), None);
    let wrapped = Interceptor::ours().intercept(original).unwrap();
    let after = label_of(registry, &Subject::Invocable(Arc::clone(wrapped.descriptor())), None);
    assert_eq!(before.unwrap(), after.unwrap());
}

// ============================================================================
// LOCKDOWN SCENARIOS
// ============================================================================

#[test]
fn answer_namespace() {
    let namespace = create_namespace([("answer", 42)]).unwrap();

    let err = namespace.instantiate(Arguments::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImpermissibleOperation);

    let err = namespace.assign_attribute("answer", Value::Integer(43)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);
    assert_eq!(
        err.to_string(),
        "Attempt to assign immutable attribute 'answer' on class 'lockup.Namespace'."
    );

    assert_eq!(namespace.attribute("answer").unwrap(), Value::Integer(42));
    assert_eq!(namespace.directory(), vec!["answer"]);
}

#[test]
fn sealing_is_idempotent() {
    let mut math = OpenModule::new("math");
    math.define("tau", 6.283185307179586);
    let math = reclassify_module(math);
    let again = reclassify_module(Arc::clone(&math));
    assert!(Arc::ptr_eq(&math, &again));
    assert_eq!(again.attribute("tau").unwrap(), Value::Float(6.283185307179586));

    let circle = ClassDraft::new("shapes", "Circle").seal().unwrap();
    let resealed = Arc::clone(&circle).seal().unwrap();
    assert!(Arc::ptr_eq(&circle, &resealed));
}

#[test]
fn deletion_checks_existence_before_indelibility() {
    let circle = ClassDraft::new("shapes", "Circle").define("radius", 1).seal().unwrap();
    let empty = OpenModule::new("empty").reclassify();
    let guards: [&dyn MutableAttributeGuard; 2] = [&*circle, &*empty];
    for guard in guards {
        let err = guard.delete_attribute("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InaccessibleAttribute);
    }
    let err = circle.delete_attribute("radius").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);
}
