//! UI primitives available to generated components.
//!
//! A primitive renders as a single host element whose `className` is the
//! primitive's utility classes merged with the caller's. `variant` and
//! `size` (or `orientation` for `Separator`) select from small class tables.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Alert,
    AlertDescription,
    AlertTitle,
    Badge,
    Button,
    Card,
    CardContent,
    CardDescription,
    CardFooter,
    CardHeader,
    CardTitle,
    Input,
    Label,
    Separator,
}

const BUTTON_BASE: &str = "inline-flex items-center justify-center whitespace-nowrap rounded-md text-sm font-medium ring-offset-background transition-colors focus-visible:outline-none focus-visible:ring-2 focus-visible:ring-ring focus-visible:ring-offset-2 disabled:pointer-events-none disabled:opacity-50";

const BUTTON_VARIANTS: &[(&str, &str)] = &[
    ("default", "bg-primary text-primary-foreground hover:bg-primary/90"),
    ("destructive", "bg-destructive text-destructive-foreground hover:bg-destructive/90"),
    ("outline", "border border-input bg-background hover:bg-accent hover:text-accent-foreground"),
    ("secondary", "bg-secondary text-secondary-foreground hover:bg-secondary/80"),
    ("ghost", "hover:bg-accent hover:text-accent-foreground"),
    ("link", "text-primary underline-offset-4 hover:underline"),
];

const BUTTON_SIZES: &[(&str, &str)] = &[
    ("default", "h-10 px-4 py-2"),
    ("sm", "h-9 rounded-md px-3"),
    ("lg", "h-11 rounded-md px-8"),
    ("icon", "h-10 w-10"),
];

const BADGE_BASE: &str = "inline-flex items-center rounded-full border px-2.5 py-0.5 text-xs font-semibold transition-colors focus:outline-none focus:ring-2 focus:ring-ring focus:ring-offset-2";

const BADGE_VARIANTS: &[(&str, &str)] = &[
    ("default", "border-transparent bg-primary text-primary-foreground hover:bg-primary/80"),
    ("secondary", "border-transparent bg-secondary text-secondary-foreground hover:bg-secondary/80"),
    ("destructive", "border-transparent bg-destructive text-destructive-foreground hover:bg-destructive/80"),
    ("outline", "text-foreground"),
];

const ALERT_BASE: &str = "relative w-full rounded-lg border p-4 [&>svg~*]:pl-7 [&>svg+div]:translate-y-[-3px] [&>svg]:absolute [&>svg]:left-4 [&>svg]:top-4 [&>svg]:text-foreground";

const ALERT_VARIANTS: &[(&str, &str)] = &[
    ("default", "bg-background text-foreground"),
    ("destructive", "border-destructive/50 text-destructive dark:border-destructive [&>svg]:text-destructive"),
];

const SEPARATOR_ORIENTATIONS: &[(&str, &str)] = &[
    ("horizontal", "h-[1px] w-full"),
    ("vertical", "h-full w-[1px]"),
];

const NO_OPTIONS: &[(&str, &str)] = &[];

impl Primitive {
    pub const ALL: &'static [Primitive] = &[
        Primitive::Alert,
        Primitive::AlertDescription,
        Primitive::AlertTitle,
        Primitive::Badge,
        Primitive::Button,
        Primitive::Card,
        Primitive::CardContent,
        Primitive::CardDescription,
        Primitive::CardFooter,
        Primitive::CardHeader,
        Primitive::CardTitle,
        Primitive::Input,
        Primitive::Label,
        Primitive::Separator,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Alert => "Alert",
            Primitive::AlertDescription => "AlertDescription",
            Primitive::AlertTitle => "AlertTitle",
            Primitive::Badge => "Badge",
            Primitive::Button => "Button",
            Primitive::Card => "Card",
            Primitive::CardContent => "CardContent",
            Primitive::CardDescription => "CardDescription",
            Primitive::CardFooter => "CardFooter",
            Primitive::CardHeader => "CardHeader",
            Primitive::CardTitle => "CardTitle",
            Primitive::Input => "Input",
            Primitive::Label => "Label",
            Primitive::Separator => "Separator",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// The `@/components/ui/<module>` path segment that exports this primitive.
    pub fn module(self) -> &'static str {
        match self {
            Primitive::Alert | Primitive::AlertDescription | Primitive::AlertTitle => "alert",
            Primitive::Badge => "badge",
            Primitive::Button => "button",
            Primitive::Card
            | Primitive::CardContent
            | Primitive::CardDescription
            | Primitive::CardFooter
            | Primitive::CardHeader
            | Primitive::CardTitle => "card",
            Primitive::Input => "input",
            Primitive::Label => "label",
            Primitive::Separator => "separator",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Primitive::AlertTitle => "h5",
            Primitive::Button => "button",
            Primitive::CardTitle => "h3",
            Primitive::CardDescription => "p",
            Primitive::Input => "input",
            Primitive::Label => "label",
            _ => "div",
        }
    }

    fn base(self) -> &'static str {
        match self {
            Primitive::Alert => ALERT_BASE,
            Primitive::AlertDescription => "text-sm [&_p]:leading-relaxed",
            Primitive::AlertTitle => "mb-1 font-medium leading-none tracking-tight",
            Primitive::Badge => BADGE_BASE,
            Primitive::Button => BUTTON_BASE,
            Primitive::Card => "rounded-lg border bg-card text-card-foreground shadow-sm",
            Primitive::CardContent => "p-6 pt-0",
            Primitive::CardDescription => "text-sm text-muted-foreground",
            Primitive::CardFooter => "flex items-center p-6 pt-0",
            Primitive::CardHeader => "flex flex-col space-y-1.5 p-6",
            Primitive::CardTitle => "text-2xl font-semibold leading-none tracking-tight",
            Primitive::Input => "flex h-10 w-full rounded-md border border-input bg-background px-3 py-2 text-sm ring-offset-background file:border-0 file:bg-transparent file:text-sm file:font-medium placeholder:text-muted-foreground focus-visible:outline-none focus-visible:ring-2 focus-visible:ring-ring focus-visible:ring-offset-2 disabled:cursor-not-allowed disabled:opacity-50",
            Primitive::Label => "text-sm font-medium leading-none peer-disabled:cursor-not-allowed peer-disabled:opacity-70",
            Primitive::Separator => "shrink-0 bg-border",
        }
    }

    /// Name of the prop that selects from [`Primitive::variants`].
    pub fn variant_prop(self) -> &'static str {
        match self {
            Primitive::Separator => "orientation",
            _ => "variant",
        }
    }

    fn variants(self) -> (&'static [(&'static str, &'static str)], &'static str) {
        match self {
            Primitive::Alert => (ALERT_VARIANTS, "default"),
            Primitive::Badge => (BADGE_VARIANTS, "default"),
            Primitive::Button => (BUTTON_VARIANTS, "default"),
            Primitive::Separator => (SEPARATOR_ORIENTATIONS, "horizontal"),
            _ => (NO_OPTIONS, ""),
        }
    }

    fn sizes(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Primitive::Button => BUTTON_SIZES,
            _ => NO_OPTIONS,
        }
    }

    /// Whether `variant`/`size` props are consumed rather than passed through.
    pub fn consumes(self, prop: &str) -> bool {
        (prop == self.variant_prop() && !self.variants().0.is_empty())
            || (prop == "size" && !self.sizes().is_empty())
            || (self == Primitive::Separator && prop == "decorative")
    }

    /// Utility classes for the given selections; unknown selections add nothing.
    pub fn classes(self, variant: Option<&str>, size: Option<&str>, extra: Option<&str>) -> String {
        let (variants, default_variant) = self.variants();
        let mut parts = vec![self.base()];
        if let Some(cls) = pick(variants, variant.unwrap_or(default_variant)) {
            parts.push(cls);
        }
        if let Some(cls) = pick(self.sizes(), size.unwrap_or("default")) {
            parts.push(cls);
        }
        if let Some(extra) = extra.filter(|e| !e.trim().is_empty()) {
            parts.push(extra.trim());
        }
        parts.join(" ")
    }

    /// Fixed attributes rendered before caller props.
    pub fn fixed_attrs(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Primitive::Alert => &[("role", "alert")],
            Primitive::Separator => &[("role", "none")],
            _ => &[],
        }
    }
}

fn pick(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}
