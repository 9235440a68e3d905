//! Invocables, their descriptors and argument binding.
//!
//! An [`Invocable`] is anything that can be called across the boundary: a
//! free function, a method, a class constructor or a callable object. Its
//! [`Descriptor`] carries the identity used for labels (module, name,
//! qualified name, form, flavor) and the [`Signature`] that arguments are
//! bound against before the call happens.
//!
//! Binding follows the usual parameter kinds: positional-only,
//! positional-or-keyword, a sequence of extra positional arguments,
//! keyword-only and a dictionary of extra nominative arguments.
//!
//! ```rust
//! use lockup::{arguments, Signature};
//!
//! let signature = Signature::new()
//!     .positional("a")
//!     .optional("b", 1)
//!     .var_positional("rest");
//! let arguments = arguments![3, 4, 5, 6];
//! let binding = signature.bind(&arguments).unwrap();
//! assert_eq!(binding.value("b").and_then(|v| v.as_integer()), Some(4));
//! assert_eq!(binding.extra_positional("rest").map(<[_]>::len), Some(2));
//!
//! let failure = signature.bind(&arguments![; c = 1]).unwrap_err();
//! assert_eq!(failure.to_string(), "missing a required argument: 'a'");
//! ```

use crate::{ClassPath, Fault, Subject};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Values
// ============================================================================

/// Dynamic value passed through invocations and attributes.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value.
    Unit,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(Cow<'static, str>),
    /// Ordered sequence of values.
    Sequence(Vec<Value>),
    /// Reference to a labelable entity.
    Subject(Subject),
    /// Error recovered by a releasing apprehension policy.
    Recovered(Arc<Fault>),
}

/// Coarse class of a [`Value`], used in argument validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueClass {
    /// [`Value::Unit`]
    Unit,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Integer`]
    Integer,
    /// [`Value::Float`]
    Float,
    /// [`Value::Text`]
    Text,
    /// [`Value::Sequence`]
    Sequence,
    /// [`Value::Subject`]
    Subject,
    /// [`Value::Recovered`]
    Recovered,
}

impl ValueClass {
    /// Human label, as used in "must be ..." expectations.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool => "boolean",
            Self::Integer => "integer",
            Self::Float => "floating point number",
            Self::Text => "text",
            Self::Sequence => "sequence",
            Self::Subject => "labelable entity",
            Self::Recovered => "recovered error",
        }
    }
}

impl Value {
    /// Text value.
    #[inline]
    pub fn text(value: impl Into<Cow<'static, str>>) -> Self {
        Self::Text(value.into())
    }

    /// Coarse class of this value.
    pub const fn class(&self) -> ValueClass {
        match self {
            Self::Unit => ValueClass::Unit,
            Self::Bool(_) => ValueClass::Bool,
            Self::Integer(_) => ValueClass::Integer,
            Self::Float(_) => ValueClass::Float,
            Self::Text(_) => ValueClass::Text,
            Self::Sequence(_) => ValueClass::Sequence,
            Self::Subject(_) => ValueClass::Subject,
            Self::Recovered(_) => ValueClass::Recovered,
        }
    }

    /// Is this [`Value::Unit`]?
    #[inline]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Borrow as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Read as an integer.
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Read as a boolean.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Borrow as a subject.
    pub const fn as_subject(&self) -> Option<&Subject> {
        match self {
            Self::Subject(subject) => Some(subject),
            _ => None,
        }
    }

    /// Borrow as a recovered error.
    pub fn as_recovered(&self) -> Option<&Fault> {
        match self {
            Self::Recovered(fault) => Some(fault),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Sequence(a), Self::Sequence(b)) => a == b,
            (Self::Subject(a), Self::Subject(b)) => a == b,
            // Recovered errors compare by identity.
            (Self::Recovered(a), Self::Recovered(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Text(text) => write!(f, "'{text}'"),
            Self::Sequence(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::Subject(subject) => write!(f, "<{subject}>"),
            Self::Recovered(fault) => write!(f, "<recovered {}>", fault.class()),
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

impl From<Cow<'static, str>> for Value {
    fn from(value: Cow<'static, str>) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::Sequence(values)
    }
}

impl From<Subject> for Value {
    fn from(subject: Subject) -> Self {
        Self::Subject(subject)
    }
}

impl From<ClassPath> for Value {
    fn from(path: ClassPath) -> Self {
        Self::Subject(Subject::Class(path))
    }
}

impl From<Arc<Descriptor>> for Value {
    fn from(descriptor: Arc<Descriptor>) -> Self {
        Self::Subject(Subject::Invocable(descriptor))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unit, Into::into)
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Positional and named arguments of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: SmallVec<[Value; 4]>,
    named: SmallVec<[(Cow<'static, str>, Value); 2]>,
}

impl Arguments {
    /// Empty argument list.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    #[inline]
    pub fn push(&mut self, value: impl Into<Value>) {
        self.positional.push(value.into());
    }

    /// Append a named argument.
    ///
    /// Repeated names are kept; binding reports them.
    #[inline]
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) {
        self.named.push((name.into(), value.into()));
    }

    /// Builder form of [`push`](Self::push).
    #[inline]
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.push(value);
        self
    }

    /// Builder form of [`insert`](Self::insert).
    #[inline]
    pub fn with_named(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Positional arguments in order.
    #[inline]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Named arguments in order.
    #[inline]
    pub fn named(&self) -> &[(Cow<'static, str>, Value)] {
        &self.named
    }

    /// Total number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// No arguments at all?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

// ============================================================================
// Signatures
// ============================================================================

/// Kind of a formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKind {
    /// Bound by position only.
    PositionalOnly,
    /// Bound by position or by name.
    PositionalOrKeyword,
    /// Collects surplus positional arguments.
    VarPositional,
    /// Bound by name only.
    KeywordOnly,
    /// Collects surplus named arguments.
    VarKeyword,
}

/// Formal parameter of a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: Cow<'static, str>,
    kind: ParameterKind,
    default: Option<Value>,
}

impl Parameter {
    /// Parameter without a default.
    pub fn new(name: impl Into<Cow<'static, str>>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Attach a default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Parameter name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter kind.
    #[inline]
    pub const fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// Default value, if any.
    #[inline]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Ordered formal parameters of an invocable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    parameters: SmallVec<[Parameter; 4]>,
}

/// Structural defect of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureDefect {
    /// Two parameters share a name.
    DuplicateName(String),
    /// A parameter name is empty.
    EmptyName,
    /// Parameter kinds are out of order.
    KindOrder(String),
    /// More than one collector of the same kind.
    RepeatedCollector(String),
    /// A collector declares a default.
    CollectorDefault(String),
    /// A positional parameter without default follows one with a default.
    RequiredAfterOptional(String),
}

impl fmt::Display for SignatureDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "duplicate parameter name '{name}'"),
            Self::EmptyName => f.write_str("empty parameter name"),
            Self::KindOrder(name) => write!(f, "parameter '{name}' is out of order"),
            Self::RepeatedCollector(name) => {
                write!(f, "parameter '{name}' repeats an extra arguments collector")
            }
            Self::CollectorDefault(name) => {
                write!(f, "extra arguments collector '{name}' cannot have a default")
            }
            Self::RequiredAfterOptional(name) => {
                write!(f, "required parameter '{name}' follows an optional parameter")
            }
        }
    }
}

impl Error for SignatureDefect {}

impl Signature {
    /// Signature without parameters.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Append a required positional-or-keyword parameter.
    pub fn positional(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.parameter(Parameter::new(name, ParameterKind::PositionalOrKeyword))
    }

    /// Append a positional-or-keyword parameter with a default.
    pub fn optional(self, name: impl Into<Cow<'static, str>>, default: impl Into<Value>) -> Self {
        self.parameter(Parameter::new(name, ParameterKind::PositionalOrKeyword).with_default(default))
    }

    /// Append a required positional-only parameter.
    pub fn positional_only(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.parameter(Parameter::new(name, ParameterKind::PositionalOnly))
    }

    /// Append a collector of extra positional arguments.
    pub fn var_positional(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.parameter(Parameter::new(name, ParameterKind::VarPositional))
    }

    /// Append a required keyword-only parameter.
    pub fn keyword_only(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.parameter(Parameter::new(name, ParameterKind::KeywordOnly))
    }

    /// Append a keyword-only parameter with a default.
    pub fn keyword_optional(
        self,
        name: impl Into<Cow<'static, str>>,
        default: impl Into<Value>,
    ) -> Self {
        self.parameter(Parameter::new(name, ParameterKind::KeywordOnly).with_default(default))
    }

    /// Append a collector of extra named arguments.
    pub fn var_keyword(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.parameter(Parameter::new(name, ParameterKind::VarKeyword))
    }

    /// Formal parameters in order.
    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Find a parameter and its position.
    pub fn find(&self, name: &str) -> Option<(usize, &Parameter)> {
        self.parameters
            .iter()
            .enumerate()
            .find(|(_, parameter)| parameter.name() == name)
    }

    /// Check structural well-formedness.
    pub fn validate(&self) -> Result<(), SignatureDefect> {
        let mut previous = ParameterKind::PositionalOnly;
        let mut seen_default = false;
        for (index, parameter) in self.parameters.iter().enumerate() {
            let name = parameter.name();
            if name.is_empty() {
                return Err(SignatureDefect::EmptyName);
            }
            if self.parameters[..index].iter().any(|p| p.name() == name) {
                return Err(SignatureDefect::DuplicateName(name.to_owned()));
            }
            if parameter.kind < previous {
                return Err(SignatureDefect::KindOrder(name.to_owned()));
            }
            let collector = matches!(
                parameter.kind,
                ParameterKind::VarPositional | ParameterKind::VarKeyword
            );
            if collector && parameter.kind == previous && index > 0 {
                return Err(SignatureDefect::RepeatedCollector(name.to_owned()));
            }
            if collector && parameter.default.is_some() {
                return Err(SignatureDefect::CollectorDefault(name.to_owned()));
            }
            if matches!(
                parameter.kind,
                ParameterKind::PositionalOnly | ParameterKind::PositionalOrKeyword
            ) {
                match parameter.default {
                    Some(_) => seen_default = true,
                    None if seen_default => {
                        return Err(SignatureDefect::RequiredAfterOptional(name.to_owned()));
                    }
                    None => {}
                }
            }
            previous = parameter.kind;
        }
        Ok(())
    }

    /// Bind arguments to parameters without calling anything.
    ///
    /// Failures are reported in a fixed order: surplus positional
    /// arguments, then repeated values, then missing or misplaced
    /// parameters, then unexpected names.
    pub fn bind<'a>(&'a self, arguments: &'a Arguments) -> Result<Binding<'a>, BindFailure> {
        let parameters = &self.parameters;
        let positional = arguments.positional();
        let named = arguments.named();
        let mut slots: SmallVec<[Option<Slot<'a>>; 4]> =
            parameters.iter().map(|_| None).collect();

        let mut next = 0;
        for (index, parameter) in parameters.iter().enumerate() {
            match parameter.kind {
                ParameterKind::PositionalOnly | ParameterKind::PositionalOrKeyword => {
                    if next < positional.len() {
                        slots[index] = Some(Slot::Given(&positional[next]));
                        next += 1;
                    }
                }
                ParameterKind::VarPositional => {
                    slots[index] = Some(Slot::ExtraPositional(&positional[next..]));
                    next = positional.len();
                }
                _ => {}
            }
        }
        if next < positional.len() {
            return Err(BindFailure::TooManyPositional);
        }

        for (index, (key, _)) in named.iter().enumerate() {
            if named[..index].iter().any(|(k, _)| k == key) {
                return Err(BindFailure::MultipleValues(key.to_string()));
            }
        }
        for (parameter, slot) in parameters.iter().zip(&slots) {
            let by_position = matches!(slot, Some(Slot::Given(_)));
            if by_position
                && parameter.kind == ParameterKind::PositionalOrKeyword
                && named.iter().any(|(k, _)| k == parameter.name())
            {
                return Err(BindFailure::MultipleValues(parameter.name().to_owned()));
            }
        }

        let collects_named = parameters
            .iter()
            .any(|p| p.kind == ParameterKind::VarKeyword);
        let mut consumed: SmallVec<[bool; 4]> = named.iter().map(|_| false).collect();
        for (index, parameter) in parameters.iter().enumerate() {
            if slots[index].is_some() {
                continue;
            }
            let given = named.iter().position(|(k, _)| k == parameter.name());
            slots[index] = match parameter.kind {
                ParameterKind::VarPositional => Some(Slot::ExtraPositional(&[])),
                ParameterKind::VarKeyword => continue,
                ParameterKind::PositionalOnly if given.is_some() && !collects_named => {
                    return Err(BindFailure::PositionalOnlyAsKeyword(parameter.name().to_owned()));
                }
                ParameterKind::PositionalOrKeyword | ParameterKind::KeywordOnly
                    if given.is_some() =>
                {
                    let position = given.unwrap_or_default();
                    consumed[position] = true;
                    Some(Slot::Given(&named[position].1))
                }
                _ => match parameter.default.as_ref() {
                    Some(default) => Some(Slot::Default(default)),
                    None => return Err(BindFailure::MissingRequired(parameter.name().to_owned())),
                },
            };
        }

        let mut extras: SmallVec<[(&'a str, &'a Value); 2]> = SmallVec::new();
        for ((key, value), consumed) in named.iter().zip(consumed) {
            if consumed {
                continue;
            }
            if !collects_named {
                return Err(BindFailure::UnexpectedKeyword(key.to_string()));
            }
            extras.push((key.as_ref(), value));
        }

        let mut bound = SmallVec::with_capacity(parameters.len());
        for (parameter, slot) in parameters.iter().zip(slots) {
            let slot = match slot {
                Some(slot) => slot,
                None => Slot::ExtraNamed(std::mem::take(&mut extras)),
            };
            bound.push((parameter.name(), slot));
        }
        Ok(Binding { slots: bound })
    }
}

/// Reason arguments could not be bound to a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindFailure {
    /// More positional arguments than positional parameters.
    TooManyPositional,
    /// A required parameter received nothing.
    MissingRequired(String),
    /// A named argument matches no parameter.
    UnexpectedKeyword(String),
    /// A parameter received more than one value.
    MultipleValues(String),
    /// A positional-only parameter was passed by name.
    PositionalOnlyAsKeyword(String),
}

impl fmt::Display for BindFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyPositional => f.write_str("too many positional arguments"),
            Self::MissingRequired(name) => write!(f, "missing a required argument: '{name}'"),
            Self::UnexpectedKeyword(name) => {
                write!(f, "got an unexpected keyword argument '{name}'")
            }
            Self::MultipleValues(name) => write!(f, "multiple values for argument '{name}'"),
            Self::PositionalOnlyAsKeyword(name) => write!(
                f,
                "'{name}' parameter is positional only, but was passed as a keyword"
            ),
        }
    }
}

impl Error for BindFailure {}

#[derive(Debug, Clone)]
enum Slot<'a> {
    Given(&'a Value),
    Default(&'a Value),
    ExtraPositional(&'a [Value]),
    ExtraNamed(SmallVec<[(&'a str, &'a Value); 2]>),
}

/// Arguments bound to the parameters of a signature.
#[derive(Debug, Clone)]
pub struct Binding<'a> {
    slots: SmallVec<[(&'a str, Slot<'a>); 4]>,
}

impl<'a> Binding<'a> {
    fn slot(&self, name: &str) -> Option<&Slot<'a>> {
        self.slots.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
    }

    /// Value bound to a single-valued parameter, given or defaulted.
    pub fn value(&self, name: &str) -> Option<&'a Value> {
        match self.slot(name)? {
            Slot::Given(value) | Slot::Default(value) => Some(value),
            _ => None,
        }
    }

    /// Was the parameter given explicitly rather than defaulted?
    pub fn is_given(&self, name: &str) -> bool {
        matches!(self.slot(name), Some(Slot::Given(_)))
    }

    /// Surplus positional arguments collected by a parameter.
    pub fn extra_positional(&self, name: &str) -> Option<&'a [Value]> {
        match self.slot(name)? {
            Slot::ExtraPositional(values) => Some(values),
            _ => None,
        }
    }

    /// Surplus named arguments collected by a parameter.
    pub fn extra_named(&self, name: &str) -> Option<&[(&'a str, &'a Value)]> {
        match self.slot(name)? {
            Slot::ExtraNamed(values) => Some(values),
            _ => None,
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Structural form of an invocable.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    /// Free function, or a function defined on a class.
    Function,
    /// Method bound to an instance of the receiver class.
    Method {
        /// Class of the bound instance.
        receiver: ClassPath,
    },
    /// Class constructor; module and qualified name are the class's.
    Constructor,
    /// Instance whose class defines a call operation.
    CallableObject {
        /// Class of the instance.
        class: ClassPath,
    },
}

/// Execution flavor of a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flavor {
    /// Runs to completion when called.
    #[default]
    Ordinary,
    /// Yields a sequence of values.
    Generator,
    /// Yields a sequence of values asynchronously.
    AsyncGenerator,
    /// Returns a pending computation.
    Async,
}

/// Identity and signature of an invocable.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    form: Form,
    module: Cow<'static, str>,
    name: Cow<'static, str>,
    qualname: Cow<'static, str>,
    flavor: Flavor,
    builtin: bool,
    signature: Signature,
}

/// Name given to anonymous functions.
pub const LAMBDA_NAME: &str = "<lambda>";

/// Structural defect of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorDefect {
    /// Module name is empty.
    EmptyModule,
    /// Name is empty.
    EmptyName,
    /// Qualified name is empty or does not end with the name.
    QualnameMismatch,
    /// Signature is malformed.
    Signature(SignatureDefect),
}

impl fmt::Display for DescriptorDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyModule => f.write_str("empty module name"),
            Self::EmptyName => f.write_str("empty name"),
            Self::QualnameMismatch => f.write_str("qualified name does not end with name"),
            Self::Signature(defect) => write!(f, "malformed signature: {defect}"),
        }
    }
}

impl Error for DescriptorDefect {}

impl Descriptor {
    fn build(
        form: Form,
        module: Cow<'static, str>,
        name: Cow<'static, str>,
        qualname: Cow<'static, str>,
    ) -> Self {
        Self {
            form,
            module,
            name,
            qualname,
            flavor: Flavor::Ordinary,
            builtin: false,
            signature: Signature::new(),
        }
    }

    /// Function in a module. A dotted qualified name places it on a class.
    pub fn function(
        module: impl Into<Cow<'static, str>>,
        qualname: impl Into<Cow<'static, str>>,
    ) -> Self {
        let qualname = qualname.into();
        let name = match qualname.rsplit_once('.') {
            Some((_, name)) => Cow::Owned(name.to_owned()),
            None => qualname.clone(),
        };
        Self::build(Form::Function, module.into(), name, qualname)
    }

    /// Anonymous function in a module.
    pub fn lambda(module: impl Into<Cow<'static, str>>) -> Self {
        Self::build(
            Form::Function,
            module.into(),
            Cow::Borrowed(LAMBDA_NAME),
            Cow::Borrowed(LAMBDA_NAME),
        )
    }

    /// Method bound to an instance of `receiver`.
    pub fn method(receiver: ClassPath, name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        let qualname = Cow::Owned(format!("{}.{}", receiver.qualname(), name));
        let module = Cow::Owned(receiver.module().to_owned());
        Self::build(Form::Method { receiver }, module, name, qualname)
    }

    /// Constructor of `class`.
    pub fn constructor(class: &ClassPath) -> Self {
        Self::build(
            Form::Constructor,
            Cow::Owned(class.module().to_owned()),
            Cow::Owned(class.name().to_owned()),
            Cow::Owned(class.qualname().to_owned()),
        )
    }

    /// Callable instance of `class`.
    pub fn callable_object(class: ClassPath) -> Self {
        let module = Cow::Owned(class.module().to_owned());
        let qualname = Cow::Owned(format!("{}.__call__", class.qualname()));
        Self::build(
            Form::CallableObject { class },
            module,
            Cow::Borrowed("__call__"),
            qualname,
        )
    }

    /// Replace the signature.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Replace the flavor.
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Mark as built into the host.
    pub fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    /// Structural form.
    #[inline]
    pub const fn form(&self) -> &Form {
        &self.form
    }

    /// Defining module.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Short name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified name within the module.
    #[inline]
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    /// Execution flavor.
    #[inline]
    pub const fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Built into the host?
    #[inline]
    pub const fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Anonymous function?
    #[inline]
    pub fn is_lambda(&self) -> bool {
        self.qualname == LAMBDA_NAME
    }

    /// Formal parameters.
    #[inline]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Class path formed by module and qualified name.
    pub fn class_path(&self) -> ClassPath {
        ClassPath::new(self.module.clone(), self.qualname.clone())
    }

    /// Descriptor of an operation of this library, built on error paths.
    pub(crate) fn operation(
        module: &'static str,
        qualname: &'static str,
        parameters: &[&'static str],
    ) -> Arc<Self> {
        let signature = parameters
            .iter()
            .fold(Signature::new(), |signature, name| signature.positional(*name));
        Arc::new(Self::function(module, qualname).with_signature(signature))
    }

    /// Check structural well-formedness.
    pub fn validate(&self) -> Result<(), DescriptorDefect> {
        if self.module.is_empty() {
            return Err(DescriptorDefect::EmptyModule);
        }
        if self.name.is_empty() {
            return Err(DescriptorDefect::EmptyName);
        }
        if !self.qualname.ends_with(self.name.as_ref()) {
            return Err(DescriptorDefect::QualnameMismatch);
        }
        self.signature.validate().map_err(DescriptorDefect::Signature)
    }
}

// ============================================================================
// Invocables
// ============================================================================

/// Something callable across the boundary.
pub trait Invocable: Send + Sync {
    /// Identity and signature.
    fn descriptor(&self) -> &Arc<Descriptor>;

    /// Perform the call. Arguments have not been bound.
    fn call(&self, arguments: Arguments) -> Result<Value, Fault>;
}

impl<T: Invocable + ?Sized> Invocable for Arc<T> {
    fn descriptor(&self) -> &Arc<Descriptor> {
        (**self).descriptor()
    }

    fn call(&self, arguments: Arguments) -> Result<Value, Fault> {
        (**self).call(arguments)
    }
}

type Body = dyn Fn(Arguments) -> Result<Value, Fault> + Send + Sync;

/// Invocable backed by a closure.
pub struct Routine {
    descriptor: Arc<Descriptor>,
    body: Box<Body>,
}

impl Routine {
    /// Pair a descriptor with a body.
    pub fn new<F>(descriptor: Descriptor, body: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self {
            descriptor: Arc::new(descriptor),
            body: Box::new(body),
        }
    }
}

impl Invocable for Routine {
    fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    fn call(&self, arguments: Arguments) -> Result<Value, Fault> {
        (self.body)(arguments)
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("module", &self.descriptor.module())
            .field("qualname", &self.descriptor.qualname())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments;

    fn sample() -> Signature {
        Signature::new()
            .positional_only("a")
            .positional("b")
            .optional("c", 10)
            .var_positional("rest")
            .keyword_only("d")
            .var_keyword("options")
    }

    #[test]
    fn binds_every_parameter_kind() {
        let signature = sample();
        let arguments = arguments![1, 2, 3, 4, 5; d = 6, e = 7];
        let binding = signature.bind(&arguments).unwrap();
        assert_eq!(binding.value("a"), Some(&Value::Integer(1)));
        assert_eq!(binding.value("c"), Some(&Value::Integer(3)));
        assert_eq!(binding.extra_positional("rest").unwrap().len(), 2);
        assert_eq!(binding.value("d"), Some(&Value::Integer(6)));
        assert_eq!(binding.extra_named("options").unwrap()[0].0, "e");
    }

    #[test]
    fn defaults_fill_missing_parameters() {
        let signature = sample();
        let arguments = arguments![1, 2; d = 4];
        let binding = signature.bind(&arguments).unwrap();
        assert_eq!(binding.value("c"), Some(&Value::Integer(10)));
        assert!(!binding.is_given("c"));
        assert!(binding.is_given("b"));
        assert_eq!(binding.extra_positional("rest"), Some(&[][..]));
    }

    #[test]
    fn bind_failures_carry_conventional_messages() {
        let two = Signature::new().positional("a").positional("b");
        let cases = [
            (arguments![1, 2, 3], "too many positional arguments"),
            (arguments![1], "missing a required argument: 'b'"),
            (arguments![1, 2; z = 3], "got an unexpected keyword argument 'z'"),
            (arguments![1, 2; a = 3], "multiple values for argument 'a'"),
        ];
        for (arguments, message) in cases {
            assert_eq!(two.bind(&arguments).unwrap_err().to_string(), message);
        }

        let only = Signature::new().positional_only("a");
        assert_eq!(
            only.bind(&arguments![; a = 1]).unwrap_err(),
            BindFailure::PositionalOnlyAsKeyword("a".into())
        );
    }

    #[test]
    fn positional_only_names_go_to_collector() {
        let signature = Signature::new().positional_only("a").var_keyword("options");
        let arguments = arguments![1; a = 2];
        let binding = signature.bind(&arguments).unwrap();
        assert_eq!(binding.value("a"), Some(&Value::Integer(1)));
        assert_eq!(binding.extra_named("options").unwrap().len(), 1);
    }

    #[test]
    fn validate_rejects_malformed_signatures() {
        assert!(sample().validate().is_ok());
        assert_eq!(
            Signature::new().positional("a").positional("a").validate(),
            Err(SignatureDefect::DuplicateName("a".into()))
        );
        assert_eq!(
            Signature::new().keyword_only("a").positional("b").validate(),
            Err(SignatureDefect::KindOrder("b".into()))
        );
        assert_eq!(
            Signature::new().optional("a", 1).positional("b").validate(),
            Err(SignatureDefect::RequiredAfterOptional("b".into()))
        );
        assert_eq!(
            Signature::new().var_positional("a").var_positional("b").validate(),
            Err(SignatureDefect::RepeatedCollector("b".into()))
        );
    }

    #[test]
    fn descriptor_shapes() {
        let method = Descriptor::method(ClassPath::new("shapes", "Circle"), "area");
        assert_eq!(method.qualname(), "Circle.area");
        assert_eq!(method.module(), "shapes");

        let nested = Descriptor::function("shapes", "Circle.from_radius");
        assert_eq!(nested.name(), "from_radius");

        assert!(Descriptor::lambda("shapes").is_lambda());
        assert!(Descriptor::function("", "f").validate().is_err());
    }

    #[test]
    fn recovered_values_compare_by_identity() {
        let fault = Arc::new(Fault::new(BindFailure::TooManyPositional));
        let a = Value::Recovered(Arc::clone(&fault));
        let b = Value::Recovered(fault);
        let c = Value::Recovered(Arc::new(Fault::new(BindFailure::TooManyPositional)));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn routine_calls_body() {
        let routine = Routine::new(Descriptor::function("m", "double"), |arguments| {
            Ok(Value::Integer(arguments.positional()[0].as_integer().unwrap_or(0) * 2))
        });
        assert_eq!(routine.call(arguments![21]).unwrap(), Value::Integer(42));
    }
}
