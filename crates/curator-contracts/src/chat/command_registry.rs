#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is one free-text value.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "theme",
        action: "start_gallery",
    },
    CommandSpec {
        command: "suggest",
        action: "suggest_themes",
    },
    CommandSpec {
        command: "critic",
        action: "set_critic",
    },
    CommandSpec {
        command: "backend",
        action: "set_backend",
    },
    CommandSpec {
        command: "open",
        action: "open_gallery",
    },
    CommandSpec {
        command: "toggle",
        action: "toggle_agent",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "load",
    action: "load_feed",
}];

pub(crate) const IMAGE_ID_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "remove",
        action: "remove_image",
    },
    CommandSpec {
        command: "select",
        action: "select_image",
    },
    CommandSpec {
        command: "uncritique",
        action: "delete_critique",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "images",
        action: "list_images",
    },
    CommandSpec {
        command: "wait",
        action: "wait",
    },
    CommandSpec {
        command: "gallery_critique",
        action: "gallery_critique",
    },
    CommandSpec {
        command: "gallery_critique_delete",
        action: "gallery_critique_delete",
    },
    CommandSpec {
        command: "report",
        action: "report",
    },
    CommandSpec {
        command: "save",
        action: "save_gallery",
    },
    CommandSpec {
        command: "galleries",
        action: "list_galleries",
    },
    CommandSpec {
        command: "agents",
        action: "list_agents",
    },
    CommandSpec {
        command: "models",
        action: "list_models",
    },
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const ADD_COMMAND: CommandSpec = CommandSpec {
    command: "add",
    action: "add_images",
};

pub(crate) const CRITIQUE_COMMAND: CommandSpec = CommandSpec {
    command: "critique",
    action: "critique_image",
};

pub(crate) const DEFAULT_ADD_COUNT: u64 = 3;

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/theme",
    "/suggest",
    "/load",
    "/add",
    "/images",
    "/remove",
    "/select",
    "/critic",
    "/backend",
    "/critique",
    "/uncritique",
    "/wait",
    "/gallery_critique",
    "/gallery_critique_delete",
    "/report",
    "/save",
    "/galleries",
    "/open",
    "/agents",
    "/toggle",
    "/models",
    "/reset",
    "/quit",
];
