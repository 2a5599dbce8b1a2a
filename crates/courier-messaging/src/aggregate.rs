//! Aggregates that receive messages through the pipeline.

use courier_core::aggregate::AggregateRoot;
use uuid::Uuid;

use crate::handlers::Handlers;

/// An aggregate root addressable by the pipeline.
///
/// Each implementation declares its kind name, how to construct an empty
/// instance, and the capability table mapping every accepted message type to
/// exactly one handler. State reactions live in
/// [`AggregateRoot::apply`], which replay and live handling share.
pub trait MessagingAggregate: AggregateRoot + Sized + 'static {
    /// Identifies this aggregate kind (e.g. "cargo"). Envelopes address
    /// aggregates by this name.
    const AGGREGATE_TYPE: &'static str;

    /// Constructs an empty instance with no history applied.
    fn new(id: Uuid) -> Self;

    /// Declares the handler for each accepted message type.
    fn handlers() -> Handlers<Self>;
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use courier_core::aggregate::AggregateRoot;
    use courier_core::envelope::ProcessingRequirement;
    use courier_core::error::DomainError;
    use courier_core::event::{Event, EventKind};
    use courier_core::message::Message;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use super::MessagingAggregate;
    use crate::context::HandlingContext;
    use crate::handlers::Handlers;

    /// Opens a tally.
    #[derive(Debug, Clone)]
    pub(crate) struct OpenTally;

    /// Adds to a tally.
    #[derive(Debug, Clone)]
    pub(crate) struct Bump {
        pub by: u32,
    }

    /// Adds to a tally, then asks a peer tally to do the same.
    #[derive(Debug, Clone)]
    pub(crate) struct BumpAndForward {
        pub by: u32,
        pub peer: Uuid,
    }

    /// Raises an event and then rejects the message.
    #[derive(Debug, Clone)]
    pub(crate) struct BumpThenFail;

    /// A message no tally handles.
    #[derive(Debug, Clone)]
    pub(crate) struct Unhandled;

    impl Message for OpenTally {
        fn message_type(&self) -> &'static str {
            "tally.open"
        }
    }

    impl Message for Bump {
        fn message_type(&self) -> &'static str {
            "tally.bump"
        }
    }

    impl Message for BumpAndForward {
        fn message_type(&self) -> &'static str {
            "tally.bump_and_forward"
        }
    }

    impl Message for BumpThenFail {
        fn message_type(&self) -> &'static str {
            "tally.bump_then_fail"
        }
    }

    impl Message for Unhandled {
        fn message_type(&self) -> &'static str {
            "tally.unhandled"
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub(crate) enum TallyEventKind {
        Opened,
        Bumped { by: u32 },
    }

    impl EventKind for TallyEventKind {
        fn event_type(&self) -> &'static str {
            match self {
                Self::Opened => "tally.opened",
                Self::Bumped { .. } => "tally.bumped",
            }
        }
    }

    pub(crate) type TallyEvent = Event<TallyEventKind>;

    /// A counter aggregate used as a test fixture.
    #[derive(Debug)]
    pub(crate) struct Tally {
        pub id: Uuid,
        pub version: i64,
        pub opened: bool,
        pub total: u32,
        uncommitted_events: Vec<TallyEvent>,
    }

    impl Tally {
        fn raise(&mut self, kind: TallyEventKind, ctx: &HandlingContext) {
            let metadata = ctx.event_metadata(self.id, self.next_sequence_number(), kind.event_type());
            self.apply_change(Event { metadata, kind });
        }

        fn open(&mut self, _msg: &OpenTally, ctx: &mut HandlingContext) -> Result<(), DomainError> {
            self.raise(TallyEventKind::Opened, ctx);
            Ok(())
        }

        fn bump(&mut self, msg: &Bump, ctx: &mut HandlingContext) -> Result<(), DomainError> {
            self.raise(TallyEventKind::Bumped { by: msg.by }, ctx);
            Ok(())
        }

        fn bump_and_forward(
            &mut self,
            msg: &BumpAndForward,
            ctx: &mut HandlingContext,
        ) -> Result<(), DomainError> {
            self.raise(TallyEventKind::Bumped { by: msg.by }, ctx);
            ctx.to::<Tally>(msg.peer)
                .ensuring(ProcessingRequirement::RequiresExisting)
                .send(Bump { by: msg.by });
            Ok(())
        }

        fn bump_then_fail(
            &mut self,
            _msg: &BumpThenFail,
            ctx: &mut HandlingContext,
        ) -> Result<(), DomainError> {
            self.raise(TallyEventKind::Bumped { by: 1 }, ctx);
            ctx.to::<Tally>(Uuid::new_v4()).send(Bump { by: 1 });
            Err(DomainError::Validation("tally refuses".into()))
        }
    }

    impl AggregateRoot for Tally {
        type Event = TallyEvent;

        fn aggregate_id(&self) -> Uuid {
            self.id
        }

        fn version(&self) -> i64 {
            self.version
        }

        fn apply(&mut self, event: &Self::Event) {
            match &event.kind {
                TallyEventKind::Opened => self.opened = true,
                TallyEventKind::Bumped { by } => self.total += by,
            }
            self.version += 1;
        }

        fn uncommitted_events(&self) -> &[Self::Event] {
            &self.uncommitted_events
        }

        fn push_uncommitted(&mut self, event: Self::Event) {
            self.uncommitted_events.push(event);
        }

        fn clear_uncommitted_events(&mut self) {
            self.uncommitted_events.clear();
        }
    }

    impl MessagingAggregate for Tally {
        const AGGREGATE_TYPE: &'static str = "tally";

        fn new(id: Uuid) -> Self {
            Self {
                id,
                version: 0,
                opened: false,
                total: 0,
                uncommitted_events: Vec::new(),
            }
        }

        fn handlers() -> Handlers<Self> {
            Handlers::new()
                .on(Self::open)
                .on(Self::bump)
                .on(Self::bump_and_forward)
                .on(Self::bump_then_fail)
        }
    }

    /// An aggregate that declares two handlers for `Bump`.
    #[derive(Debug)]
    pub(crate) struct Confused {
        inner: Tally,
    }

    impl AggregateRoot for Confused {
        type Event = TallyEvent;

        fn aggregate_id(&self) -> Uuid {
            self.inner.id
        }

        fn version(&self) -> i64 {
            self.inner.version
        }

        fn apply(&mut self, event: &Self::Event) {
            self.inner.apply(event);
        }

        fn uncommitted_events(&self) -> &[Self::Event] {
            self.inner.uncommitted_events()
        }

        fn push_uncommitted(&mut self, event: Self::Event) {
            self.inner.push_uncommitted(event);
        }

        fn clear_uncommitted_events(&mut self) {
            self.inner.clear_uncommitted_events();
        }
    }

    impl MessagingAggregate for Confused {
        const AGGREGATE_TYPE: &'static str = "confused";

        fn new(id: Uuid) -> Self {
            Self {
                inner: Tally::new(id),
            }
        }

        fn handlers() -> Handlers<Self> {
            Handlers::new()
                .on(|this: &mut Self, msg: &Bump, ctx: &mut HandlingContext| {
                    this.inner.bump(msg, ctx)
                })
                .on(|_: &mut Self, _: &Bump, _: &mut HandlingContext| Ok(()))
        }
    }
}
